// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The embeddable engine

use crate::config::EngineConfig;
use crate::error::{EngineError, RequireError, Result};
use crate::globals::{self, stdio::StdioStreams};
use crate::module_system::{
    Capability, CapabilityFlags, HttpFetcher, ReadOnlyStorage, Realms, Scope, TrustGate,
};
use crate::modules;
use boa_engine::{Context, JsError, JsObject, JsValue, Source};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info};

/// A script engine with a trust-enforcing `require`.
///
/// An engine is single-threaded (`!Send`) and every entry point takes
/// `&mut self`, so one engine runs one script at a time. Create one engine
/// per thread when parallelism is needed; engines share nothing.
pub struct Engine {
    /// Trust state, builtins and module cache
    gate: Rc<TrustGate>,
    /// Script context all modules run in
    context: Context,
    /// Streams behind `console` and `@stdio`
    streams: StdioStreams,
    /// Configuration the engine was built from
    config: EngineConfig,
    /// Number of `eval` calls so far
    evaluations: usize,
}

impl Engine {
    /// Create an engine with the default configuration, anchored at the
    /// current directory
    pub fn new() -> Result<Self> {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine from `config`.
    ///
    /// Freezes the intrinsics, installs `console` and `require`, and registers
    /// the default builtins. Remote module bodies get a realm of their own
    /// without `require`. Any failure here is fatal.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let mut context = Context::default();
        let streams = StdioStreams::discard();
        globals::bootstrap_realm(&streams, &mut context)?;
        let trusted_realm = context.realm().clone();
        let untrusted_realm = globals::create_untrusted_realm(&streams, &mut context)?;

        let anchor = absolute(&config.anchor)?;
        let gate = TrustGate::new(
            ReadOnlyStorage::new(anchor, config.max_module_bytes),
            Box::new(HttpFetcher::new(&config)),
            Realms {
                trusted: trusted_realm,
                untrusted: untrusted_realm,
            },
        );
        if config.with_default_modules {
            modules::register_defaults(&gate, &streams, &config, &mut context)?;
        }

        let require = gate.require_function(Scope::Root, &mut context);
        globals::install_global("require", JsObject::from(require), &mut context)?;

        for name in &config.unrestricted {
            gate.set_restricted(name, false);
        }
        info!(
            anchor = %gate.anchor().display(),
            builtins = gate.builtin_names().len(),
            "engine ready"
        );

        Ok(Self {
            gate,
            context,
            streams,
            config,
            evaluations: 0,
        })
    }

    // ---- builtins and trust -------------------------------------------------

    /// Register a builtin for trusted code.
    ///
    /// A `sensitive` builtin is dangerous: restricted until [`unrestrict`] is
    /// called and never available to remote modules.
    ///
    /// [`unrestrict`]: Engine::unrestrict
    pub fn add_builtin(
        &mut self,
        name: &str,
        sensitive: bool,
        capability: &dyn Capability,
    ) -> Result<()> {
        let flags = if sensitive {
            CapabilityFlags::DANGEROUS
        } else {
            CapabilityFlags::PLAIN
        };
        self.gate
            .register_builtin(name, capability, flags, &mut self.context)
    }

    /// Register a builtin that remote modules may also use
    pub fn add_remote_builtin(&mut self, name: &str, capability: &dyn Capability) -> Result<()> {
        self.gate.register_builtin(
            name,
            capability,
            CapabilityFlags::REMOTE_SAFE,
            &mut self.context,
        )
    }

    /// Let trusted code load `name`. Dangerous builtins stay unavailable to
    /// remote code.
    pub fn unrestrict(&mut self, name: &str) {
        self.gate.set_restricted(name, false);
    }

    /// Forbid every tier from loading `name`
    pub fn restrict(&mut self, name: &str) {
        self.gate.set_restricted(name, true);
    }

    /// Check if `name` is restricted
    pub fn is_restricted(&self, name: &str) -> bool {
        self.gate.is_restricted(name)
    }

    /// Check if `name` was registered as dangerous
    pub fn is_dangerous(&self, name: &str) -> bool {
        self.gate.is_dangerous(name)
    }

    /// Check if `name` is available to remote code
    pub fn is_remote_safe(&self, name: &str) -> bool {
        self.gate.is_remote_safe(name)
    }

    /// Registered builtin names, sorted
    pub fn builtin_names(&self) -> Vec<String> {
        self.gate.builtin_names()
    }

    /// Flags `name` was registered with
    pub fn builtin_flags(&self, name: &str) -> Option<CapabilityFlags> {
        self.gate.builtin_flags(name)
    }

    // ---- local modules ------------------------------------------------------

    /// Re-pin the anchor root. Relative paths are taken from the current
    /// directory.
    pub fn anchor_modules(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let anchor = absolute(path.as_ref())?;
        self.gate
            .set_storage(ReadOnlyStorage::new(anchor.clone(), self.config.max_module_bytes));
        self.config.anchor = anchor;
        Ok(())
    }

    /// Current anchor root
    pub fn anchor(&self) -> PathBuf {
        self.gate.anchor()
    }

    // ---- execution ----------------------------------------------------------

    /// Evaluate a script in the global scope.
    ///
    /// Host errors raised by `require` and not caught by the script are
    /// reported as [`EngineError::Require`] with their original kind.
    pub fn eval(&mut self, code: &str) -> Result<JsValue> {
        self.evaluations += 1;
        let name = format!("__eval_statement_{}.js", self.evaluations);
        debug!(source = %name, "evaluating");
        let source = Source::from_bytes(code).with_path(Path::new(&name));
        let result = self.context.eval(source);
        self.finish(result)
    }

    /// Read and evaluate a script file.
    ///
    /// The file itself may live anywhere; the modules it requires are still
    /// resolved under the anchor root.
    pub fn run_file(&mut self, path: impl AsRef<Path>) -> Result<JsValue> {
        let path = path.as_ref();
        let code = std::fs::read_to_string(path)?;
        debug!(file = %path.display(), "running file");
        let source = Source::from_bytes(code.as_bytes()).with_path(path);
        let result = self.context.eval(source);
        self.finish(result)
    }

    /// `require` from the host, as the engine's global `require` would.
    pub fn require(&mut self, name: &str) -> std::result::Result<JsValue, RequireError> {
        let result = match self.gate.require(name, &mut self.context) {
            Ok(exports) => Ok(exports.into()),
            Err(RequireError::Script(js)) => Err(self.gate.recover(js)),
            Err(err) => Err(err),
        };
        self.gate.clear_raised();
        result
    }

    fn finish(&mut self, result: std::result::Result<JsValue, JsError>) -> Result<JsValue> {
        self.context.run_jobs();
        let result = result.map_err(|js| match self.gate.recover(js) {
            RequireError::Script(js) => EngineError::Script(js),
            err => EngineError::Require(err),
        });
        self.gate.clear_raised();
        result
    }

    // ---- host plumbing ------------------------------------------------------

    /// Connect the engine's standard streams. Until this is called output is
    /// discarded and input is empty.
    pub fn connect_stdio(
        &mut self,
        stdin: impl Read + 'static,
        stdout: impl Write + 'static,
        stderr: impl Write + 'static,
    ) {
        self.streams
            .connect(Box::new(stdin), Box::new(stdout), Box::new(stderr));
    }

    /// Redirect only the error stream, where `console` writes
    pub fn set_stderr(&mut self, stderr: impl Write + 'static) {
        self.streams.set_stderr(Box::new(stderr));
    }

    /// Number of cached local and remote modules
    pub fn cached_modules(&self) -> usize {
        self.gate.cached_modules()
    }

    /// The underlying script context
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}
