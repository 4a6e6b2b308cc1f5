// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module cache for require()

use boa_engine::JsObject;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

/// Canonical identity of a loaded module.
///
/// Local and remote keys never collide: their specifier grammars are disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleKey {
    /// Builtin name, including the `@` prefix
    Builtin(String),
    /// Absolute file path under the anchor root
    Local(PathBuf),
    /// Canonical absolute URL
    Remote(String),
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKey::Builtin(name) => write!(f, "{}", name),
            ModuleKey::Local(path) => write!(f, "{}", path.display()),
            ModuleKey::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// A loaded module and its frozen exports
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    /// Canonical key
    pub key: ModuleKey,
    /// The module's exports, frozen before the record is created
    pub exports: JsObject,
}

/// Append-only module cache scoped to one engine
#[derive(Debug, Default)]
pub struct ModuleCache {
    /// Cache mapping canonical keys to records
    records: HashMap<ModuleKey, ModuleRecord>,
    /// Modules currently executing (for circular dependency detection)
    loading: HashSet<ModuleKey>,
}

impl ModuleCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached module by key
    pub fn get(&self, key: &ModuleKey) -> Option<&ModuleRecord> {
        self.records.get(key)
    }

    /// Add a module to the cache.
    ///
    /// An existing record is never replaced; the stored record is returned.
    pub fn insert(&mut self, record: ModuleRecord) -> &ModuleRecord {
        self.records.entry(record.key.clone()).or_insert(record)
    }

    /// Mark a module as loading. Returns false if it already was.
    pub fn begin_loading(&mut self, key: &ModuleKey) -> bool {
        self.loading.insert(key.clone())
    }

    /// Clear the loading mark, whether the load succeeded or not
    pub fn finish_loading(&mut self, key: &ModuleKey) {
        self.loading.remove(key);
    }

    /// Get the number of cached modules
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
