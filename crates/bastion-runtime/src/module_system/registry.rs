// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Registry of native (host-implemented) modules

use crate::error::{EngineError, Result};
use crate::module_system::cache::{ModuleKey, ModuleRecord};
use crate::module_system::sandbox;
use crate::module_system::specifier::{BUILTIN_PREFIX, is_valid_builtin_name};
use boa_engine::{Context, JsObject, JsResult};
use std::collections::BTreeMap;

/// A native module exposed to scripts under an `@` name.
///
/// `populate` runs exactly once, at registration. Everything it sets on
/// `exports` is frozen afterwards.
pub trait Capability {
    /// Define the module by setting its public properties on `exports`.
    fn populate(&self, exports: &JsObject, context: &mut Context) -> JsResult<()>;
}

/// Trust flags requested at registration time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilityFlags {
    /// Restricted until the host lifts it; never available to remote code
    pub dangerous: bool,
    /// Available to remote code
    pub remote_safe: bool,
}

impl CapabilityFlags {
    /// Flags for a module usable by trusted code only
    pub const PLAIN: Self = Self {
        dangerous: false,
        remote_safe: false,
    };

    /// Flags for a sensitive module
    pub const DANGEROUS: Self = Self {
        dangerous: true,
        remote_safe: false,
    };

    /// Flags for a module exposed to every tier
    pub const REMOTE_SAFE: Self = Self {
        dangerous: false,
        remote_safe: true,
    };
}

/// Immutable description of a registered capability
#[derive(Debug, Clone)]
pub struct CapabilityDescriptor {
    /// Builtin name
    pub name: String,
    /// Flags requested at registration
    pub flags: CapabilityFlags,
}

#[derive(Debug)]
struct Registered {
    descriptor: CapabilityDescriptor,
    record: ModuleRecord,
}

/// Builtin modules of one engine
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    builtins: BTreeMap<String, Registered>,
}

impl CapabilityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `name` is well formed and still free.
    pub fn check_available(&self, name: &str) -> Result<()> {
        if !is_valid_builtin_name(name) {
            return Err(EngineError::registration(
                name,
                format!("builtin modules must start with {}", BUILTIN_PREFIX),
            ));
        }
        if self.builtins.contains_key(name) {
            return Err(EngineError::registration(name, "module is already registered"));
        }
        Ok(())
    }

    /// Run a capability's populate callback against a fresh exports object
    /// and freeze the result.
    pub fn populate(
        name: &str,
        capability: &dyn Capability,
        context: &mut Context,
    ) -> Result<JsObject> {
        let exports = JsObject::with_object_proto(context.intrinsics());
        capability
            .populate(&exports, context)
            .map_err(|e| EngineError::registration(name, e))?;
        sandbox::freeze(&exports, context).map_err(|e| EngineError::registration(name, e))?;
        Ok(exports)
    }

    /// Store a populated builtin. Fails if the name was taken meanwhile.
    pub fn insert(&mut self, descriptor: CapabilityDescriptor, exports: JsObject) -> Result<()> {
        self.check_available(&descriptor.name)?;
        let record = ModuleRecord {
            key: ModuleKey::Builtin(descriptor.name.clone()),
            exports,
        };
        self.builtins
            .insert(descriptor.name.clone(), Registered { descriptor, record });
        Ok(())
    }

    /// Get a builtin's record
    pub fn get(&self, name: &str) -> Option<&ModuleRecord> {
        self.builtins.get(name).map(|entry| &entry.record)
    }

    /// Get a builtin's descriptor
    pub fn descriptor(&self, name: &str) -> Option<&CapabilityDescriptor> {
        self.builtins.get(name).map(|entry| &entry.descriptor)
    }

    /// Check if a builtin is registered
    pub fn contains(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    /// Registered builtin names, sorted
    pub fn names(&self) -> Vec<String> {
        self.builtins.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boa_engine::{JsValue, js_string};

    struct Answer;

    impl Capability for Answer {
        fn populate(&self, exports: &JsObject, context: &mut Context) -> JsResult<()> {
            exports.set(js_string!("answer"), JsValue::from(42), true, context)?;
            Ok(())
        }
    }

    #[test]
    fn test_naming_convention() {
        let registry = CapabilityRegistry::new();
        assert!(registry.check_available("@answer").is_ok());
        assert!(registry.check_available("answer").is_err());
        assert!(registry.check_available("@").is_err());
    }

    #[test]
    fn test_populate_freezes_exports() {
        let mut context = Context::default();
        let exports = CapabilityRegistry::populate("@answer", &Answer, &mut context).unwrap();
        assert!(sandbox::is_frozen(&exports, &mut context).unwrap());
        let answer = exports.get(js_string!("answer"), &mut context).unwrap();
        assert_eq!(answer.as_number(), Some(42.0));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut context = Context::default();
        let mut registry = CapabilityRegistry::new();
        let descriptor = CapabilityDescriptor {
            name: "@answer".to_string(),
            flags: CapabilityFlags::PLAIN,
        };

        let exports = CapabilityRegistry::populate("@answer", &Answer, &mut context).unwrap();
        registry.insert(descriptor.clone(), exports.clone()).unwrap();
        let err = registry.insert(descriptor, exports).unwrap_err();
        assert!(err.to_string().contains("already registered"));
        assert_eq!(registry.names(), vec!["@answer".to_string()]);
    }
}
