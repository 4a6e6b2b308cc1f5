// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The trust gate: entry point of every `require`.
//!
//! The gate owns the engine's trust state, builtin registry and module
//! cache. Loader scopes are plain values; the gate is the only shared state.
//!
//! No `RefCell` borrow is held while script code runs, since a module body may
//! call back into the gate through its own `require`.
//!
//! Local module bodies run in the trusted realm, next to the global
//! `require`. Remote module bodies run in the untrusted realm, where the only
//! `require` they can reach is the one bound to their own remote scope.

use crate::error::{EngineError, RequireError};
use crate::module_system::cache::{ModuleCache, ModuleKey, ModuleRecord};
use crate::module_system::fetch::Fetcher;
use crate::module_system::local::LocalScope;
use crate::module_system::registry::{
    Capability, CapabilityDescriptor, CapabilityFlags, CapabilityRegistry,
};
use crate::module_system::remote::RemoteScope;
use crate::module_system::sandbox;
use crate::module_system::specifier::Specifier;
use crate::module_system::storage::{ReadOnlyStorage, StorageError};
use crate::module_system::trust::TrustState;
use boa_engine::object::FunctionObjectBuilder;
use boa_engine::object::builtins::JsFunction;
use boa_engine::realm::Realm;
use boa_engine::{
    Context, JsArgs, JsError, JsNativeError, JsObject, JsResult, JsString, JsValue,
    NativeFunction, js_string,
};
use boa_gc::{Finalize, Trace};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use tracing::{debug, trace, warn};

/// Where a `require` call comes from
#[derive(Debug, Clone)]
pub enum Scope {
    /// The engine's global `require`
    Root,
    /// A trusted file module
    Local(LocalScope),
    /// An untrusted remote module
    Remote(RemoteScope),
}

/// Host errors kept for recovery. An error escaping a script is nearly always
/// one of the most recent.
const MAX_RAISED: usize = 16;

/// The two realms module bodies run in
#[derive(Clone)]
pub struct Realms {
    /// Realm of the host's scripts, local modules and the global `require`
    pub trusted: Realm,
    /// Realm of remote module bodies
    pub untrusted: Realm,
}

/// State captured by every script-facing `require` function
#[derive(Trace, Finalize)]
struct RequireBinding {
    #[unsafe_ignore_trace]
    gate: Weak<TrustGate>,
    #[unsafe_ignore_trace]
    scope: Scope,
}

/// Central dispatcher for module loading
pub struct TrustGate {
    this: Weak<TrustGate>,
    registry: RefCell<CapabilityRegistry>,
    trust: RefCell<TrustState>,
    cache: RefCell<ModuleCache>,
    storage: RefCell<ReadOnlyStorage>,
    fetcher: Box<dyn Fetcher>,
    realms: Realms,
    /// Host errors thrown into scripts and not yet claimed by the host
    raised: RefCell<VecDeque<(JsObject, RequireError)>>,
}

impl TrustGate {
    /// Create a gate reading local modules from `storage` and remote
    /// modules through `fetcher`.
    pub fn new(storage: ReadOnlyStorage, fetcher: Box<dyn Fetcher>, realms: Realms) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            registry: RefCell::new(CapabilityRegistry::new()),
            trust: RefCell::new(TrustState::new()),
            cache: RefCell::new(ModuleCache::new()),
            storage: RefCell::new(storage),
            fetcher,
            realms,
            raised: RefCell::new(VecDeque::new()),
        })
    }

    // ---- trust state ----------------------------------------------------

    /// Mark a builtin dangerous (and therefore restricted)
    pub fn mark_dangerous(&self, name: &str) {
        self.trust.borrow_mut().mark_dangerous(name);
    }

    /// Restrict or unrestrict a builtin
    pub fn set_restricted(&self, name: &str, restricted: bool) {
        debug!(module = name, restricted, "changing restriction");
        self.trust.borrow_mut().set_restricted(name, restricted);
    }

    /// Allow or disallow a builtin for remote code
    pub fn mark_remote_safe(&self, name: &str, safe: bool) {
        self.trust.borrow_mut().mark_remote_safe(name, safe);
    }

    /// Check if a name is restricted
    pub fn is_restricted(&self, name: &str) -> bool {
        self.trust.borrow().is_restricted(name)
    }

    /// Check if a name is dangerous
    pub fn is_dangerous(&self, name: &str) -> bool {
        self.trust.borrow().is_dangerous(name)
    }

    /// Check if a name is remote-safe
    pub fn is_remote_safe(&self, name: &str) -> bool {
        self.trust.borrow().is_remote_safe(name)
    }

    // ---- builtins -------------------------------------------------------

    /// Register a builtin capability.
    ///
    /// Populates and freezes its exports, then applies `flags`.
    pub fn register_builtin(
        &self,
        name: &str,
        capability: &dyn Capability,
        flags: CapabilityFlags,
        context: &mut Context,
    ) -> Result<(), EngineError> {
        self.registry.borrow().check_available(name)?;
        let exports = CapabilityRegistry::populate(name, capability, context)?;
        self.registry.borrow_mut().insert(
            CapabilityDescriptor {
                name: name.to_string(),
                flags,
            },
            exports,
        )?;

        let mut trust = self.trust.borrow_mut();
        if flags.dangerous {
            trust.mark_dangerous(name);
        }
        if flags.remote_safe {
            trust.mark_remote_safe(name, true);
        }
        debug!(module = name, ?flags, "registered builtin");
        Ok(())
    }

    /// Registered builtin names
    pub fn builtin_names(&self) -> Vec<String> {
        self.registry.borrow().names()
    }

    /// Flags a builtin was registered with
    pub fn builtin_flags(&self, name: &str) -> Option<CapabilityFlags> {
        self.registry
            .borrow()
            .descriptor(name)
            .map(|descriptor| descriptor.flags)
    }

    fn builtin(&self, name: &str) -> Result<JsObject, RequireError> {
        self.registry
            .borrow()
            .get(name)
            .map(|record| record.exports.clone())
            .ok_or_else(|| RequireError::NotFound(name.to_string()))
    }

    // ---- require --------------------------------------------------------

    /// `require` as seen by trusted code at the root of the anchor.
    pub fn require(&self, name: &str, context: &mut Context) -> Result<JsObject, RequireError> {
        self.require_trusted(&LocalScope::root(), name, context)
    }

    /// Builtin lookup on behalf of remote code.
    ///
    /// Registered, remote-safe, unrestricted and not dangerous: all four
    /// conditions are checked together.
    pub fn require_from_remote(&self, name: &str) -> Result<JsObject, RequireError> {
        let allowed = {
            let trust = self.trust.borrow();
            self.registry.borrow().contains(name) && trust.allows_remote(name)
        };
        if !allowed {
            warn!(module = name, "remote code requested a builtin it may not use");
            return Err(RequireError::RemoteNotAllowed(name.to_string()));
        }
        self.builtin(name)
    }

    /// Dispatch a `require` issued from `scope`.
    pub fn require_in(
        &self,
        scope: &Scope,
        name: &str,
        context: &mut Context,
    ) -> Result<JsObject, RequireError> {
        match scope {
            Scope::Root => self.require(name, context),
            Scope::Local(local) => self.require_trusted(local, name, context),
            Scope::Remote(remote) => remote.require(self, name, context),
        }
    }

    fn require_trusted(
        &self,
        local: &LocalScope,
        name: &str,
        context: &mut Context,
    ) -> Result<JsObject, RequireError> {
        if self.is_restricted(name) {
            warn!(module = name, "restricted module requested");
            return Err(RequireError::ModuleRestricted(name.to_string()));
        }

        let specifier = Specifier::classify(name)?;
        trace!(module = name, tier = specifier.tier(), "classified specifier");
        match specifier {
            Specifier::Builtin(name) => self.builtin(&name),
            Specifier::Local(name) => local.require(self, &name, context),
            Specifier::Remote(url) => RemoteScope::pinned(&url).load(self, name, url, context),
        }
    }

    /// Shared load path for local and remote modules.
    ///
    /// Cache hit returns the stored exports. On a miss the source is read,
    /// compiled and executed in the sandbox, and only a successful result
    /// is cached.
    pub(crate) fn load_module<F>(
        &self,
        key: ModuleKey,
        name: &str,
        child: Scope,
        context: &mut Context,
        read_source: F,
    ) -> Result<JsObject, RequireError>
    where
        F: FnOnce(&TrustGate) -> Result<String, RequireError>,
    {
        if let Some(record) = self.cache.borrow().get(&key) {
            trace!(module = %key, "module cache hit");
            return Ok(record.exports.clone());
        }
        if !self.cache.borrow_mut().begin_loading(&key) {
            return Err(RequireError::CircularDependency(key.to_string()));
        }

        let realm = match child {
            Scope::Remote(_) => self.realms.untrusted.clone(),
            Scope::Root | Scope::Local(_) => self.realms.trusted.clone(),
        };
        let result = read_source(self).and_then(|source| {
            let previous = context.enter_realm(realm);
            let require = self.require_function(child, context);
            let result = sandbox::run_module(name, &source, &require, context);
            context.enter_realm(previous);
            result
        });
        self.cache.borrow_mut().finish_loading(&key);

        let exports = match result {
            Ok(exports) => exports,
            Err(err) => {
                debug!(module = %key, error = %err, "module load failed");
                return Err(err);
            }
        };
        debug!(module = %key, "module loaded");
        let stored = self
            .cache
            .borrow_mut()
            .insert(ModuleRecord { key, exports })
            .exports
            .clone();
        Ok(stored)
    }

    /// Number of cached local and remote modules
    pub fn cached_modules(&self) -> usize {
        self.cache.borrow().len()
    }

    // ---- collaborators --------------------------------------------------

    /// Current anchor root
    pub fn anchor(&self) -> PathBuf {
        self.storage.borrow().root().to_path_buf()
    }

    /// Re-pin the anchor root, rebinding storage
    pub fn set_storage(&self, storage: ReadOnlyStorage) {
        debug!(anchor = %storage.root().display(), "anchoring local modules");
        *self.storage.borrow_mut() = storage;
    }

    pub(crate) fn read_local(&self, name: &str, relative: &Path) -> Result<String, RequireError> {
        self.storage
            .borrow()
            .read_to_string(relative)
            .map_err(|e| storage_error(name, e))
    }

    pub(crate) fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    // ---- script boundary ------------------------------------------------

    /// Build a script-facing `require` bound to `scope`, in the current realm.
    pub fn require_function(&self, scope: Scope, context: &mut Context) -> JsFunction {
        let binding = RequireBinding {
            gate: self.this.clone(),
            scope,
        };
        let native = NativeFunction::from_copy_closure_with_captures(
            |_this, args, binding: &RequireBinding, context| {
                let name = args
                    .get_or_undefined(0)
                    .to_string(context)?
                    .to_std_string_escaped();
                let gate = binding.gate.upgrade().ok_or_else(|| {
                    JsNativeError::error().with_message("module loader is no longer available")
                })?;
                match gate.require_in(&binding.scope, &name, context) {
                    Ok(exports) => Ok(exports.into()),
                    Err(err) => Err(gate.raise(err, context)),
                }
            },
            binding,
        );

        FunctionObjectBuilder::new(context.realm(), native)
            .name(js_string!("require"))
            .length(1)
            .build()
    }

    /// Turn a host error into a script exception.
    ///
    /// Script exceptions pass through as they are. Host errors become `Error`
    /// objects with a `code` property and are remembered so the host can
    /// recover the original error if the exception escapes unmodified.
    pub fn raise(&self, err: RequireError, context: &mut Context) -> JsError {
        match err {
            RequireError::Script(js) => js,
            err => {
                let object = JsNativeError::error()
                    .with_message(err.to_string())
                    .to_opaque(context);
                if let Err(e) = set_code(&object, err.code(), context) {
                    trace!(error = %e, "unable to tag error object");
                }
                let mut raised = self.raised.borrow_mut();
                if raised.len() >= MAX_RAISED {
                    raised.pop_front();
                }
                raised.push_back((object.clone(), err));
                JsError::from_opaque(object.into())
            }
        }
    }

    /// Recover the host error behind a script exception, if there is one.
    pub fn recover(&self, js: JsError) -> RequireError {
        if let Some(thrown) = js.as_opaque().and_then(JsValue::as_object) {
            let mut raised = self.raised.borrow_mut();
            if let Some(pos) = raised
                .iter()
                .position(|(object, _)| JsObject::equals(object, thrown))
            {
                if let Some((_, err)) = raised.remove(pos) {
                    return err;
                }
            }
        }
        RequireError::Script(js)
    }

    /// Forget host errors that scripts caught or replaced
    pub fn clear_raised(&self) {
        self.raised.borrow_mut().clear();
    }
}

/// Only a path leaving the anchor root is an access violation; every other
/// storage failure, OS permission errors included, is a load failure.
fn storage_error(name: &str, err: StorageError) -> RequireError {
    match err {
        StorageError::OutsideRoot(path) => RequireError::AccessDenied {
            module: name.to_string(),
            path,
        },
        other => RequireError::load_failure(name, other),
    }
}

fn set_code(object: &JsObject, code: &str, context: &mut Context) -> JsResult<()> {
    object.set(js_string!("code"), JsString::from(code), false, context)?;
    Ok(())
}
