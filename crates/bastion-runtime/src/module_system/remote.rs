// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Untrusted modules fetched over HTTP
//!
//! A remote scope is pinned to the origin of the first absolute URL in its
//! chain. Relative requires stay on that origin; an absolute URL on another
//! origin starts a brand new scope pinned there. Scopes never hop back to an
//! origin they were created from.

use crate::error::RequireError;
use crate::module_system::cache::ModuleKey;
use crate::module_system::fetch::Fetcher;
use crate::module_system::gate::{Scope, TrustGate};
use crate::module_system::specifier::{has_script_extension, is_builtin};
use boa_engine::{Context, JsObject};
use tracing::{debug, info, warn};
use url::{Origin, ParseError, Url};

/// Resolution scope for remote modules
#[derive(Debug, Clone)]
pub struct RemoteScope {
    origin: Origin,
    base: Url,
}

impl RemoteScope {
    /// Scope pinned to the origin of `url`, based at `url`
    pub fn pinned(url: &Url) -> Self {
        Self {
            origin: url.origin(),
            base: url.clone(),
        }
    }

    /// Scope for modules required by the module at `module_url`.
    ///
    /// Keeps the pinned origin even if `module_url` is elsewhere; such a
    /// scope can then fetch nothing outside its origin.
    pub fn for_module(&self, module_url: &Url) -> Self {
        Self {
            origin: self.origin.clone(),
            base: module_url.clone(),
        }
    }

    /// Whether `url` belongs to the pinned origin
    pub fn same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin
    }

    /// Fail with a security violation unless `url` is on the pinned origin
    pub fn check_origin(&self, url: &Url) -> Result<(), RequireError> {
        if self.same_origin(url) {
            return Ok(());
        }
        warn!(
            url = %url,
            origin = %self.origin.ascii_serialization(),
            "refusing to load module from another origin"
        );
        Err(RequireError::SecurityViolation {
            url: url.to_string(),
            origin: self.origin.ascii_serialization(),
        })
    }

    /// Download module source, re-checking the origin first.
    pub fn download_code(&self, fetcher: &dyn Fetcher, url: &Url) -> Result<String, RequireError> {
        self.check_origin(url)?;
        info!(url = %url, "fetching remote module");
        fetcher.fetch(url)
    }

    /// Resolve `name` to an absolute URL.
    ///
    /// Returns the target and whether it needs a freshly pinned scope.
    pub fn resolve(&self, name: &str) -> Result<(Url, bool), RequireError> {
        let (mut target, cross_origin) = match Url::parse(name) {
            Ok(url) => {
                let cross_origin = !self.same_origin(&url);
                (url, cross_origin)
            }
            Err(ParseError::RelativeUrlWithoutBase) => {
                let url = self
                    .base
                    .join(name)
                    .map_err(|_| RequireError::InvalidSpecifier(name.to_string()))?;
                (url, false)
            }
            Err(_) => return Err(RequireError::InvalidSpecifier(name.to_string())),
        };

        target.set_fragment(None);
        if !has_script_extension(target.path()) {
            return Err(RequireError::InvalidSpecifier(name.to_string()));
        }
        Ok((target, cross_origin))
    }

    /// Load a module on behalf of a remote module.
    pub(crate) fn require(
        &self,
        gate: &TrustGate,
        name: &str,
        context: &mut Context,
    ) -> Result<JsObject, RequireError> {
        if is_builtin(name) {
            return gate.require_from_remote(name);
        }

        let (target, cross_origin) = self.resolve(name)?;
        if cross_origin {
            debug!(
                from = %self.origin.ascii_serialization(),
                to = %target.origin().ascii_serialization(),
                "remote module crosses origin; pinning new scope"
            );
            return Self::pinned(&target).load(gate, name, target, context);
        }
        self.load(gate, name, target, context)
    }

    /// Load `target` within this scope.
    pub(crate) fn load(
        &self,
        gate: &TrustGate,
        name: &str,
        target: Url,
        context: &mut Context,
    ) -> Result<JsObject, RequireError> {
        self.check_origin(&target)?;

        let key = ModuleKey::Remote(target.to_string());
        let child = Scope::Remote(self.for_module(&target));
        gate.load_module(key, name, child, context, |gate| {
            self.download_code(gate.fetcher(), &target)
        })
    }
}
