// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-engine trust flags for builtin modules.
//!
//! Only the embedding host mutates these sets. Scripts can observe their
//! effect (a failing `require`) but never change them.

use std::collections::HashSet;

/// Trust flags attached to builtin names
#[derive(Debug, Default, Clone)]
pub struct TrustState {
    dangerous: HashSet<String>,
    restricted: HashSet<String>,
    remote_safe: HashSet<String>,
}

impl TrustState {
    /// Create an empty trust state
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a name dangerous. Dangerous names start out restricted.
    pub fn mark_dangerous(&mut self, name: &str) {
        self.dangerous.insert(name.to_string());
        self.restricted.insert(name.to_string());
    }

    /// Toggle restriction without touching the danger flag
    pub fn set_restricted(&mut self, name: &str, restricted: bool) {
        if restricted {
            self.restricted.insert(name.to_string());
        } else {
            self.restricted.remove(name);
        }
    }

    /// Toggle remote availability. Does not lift restriction.
    pub fn mark_remote_safe(&mut self, name: &str, safe: bool) {
        if safe {
            self.remote_safe.insert(name.to_string());
        } else {
            self.remote_safe.remove(name);
        }
    }

    /// Check if a name is restricted
    pub fn is_restricted(&self, name: &str) -> bool {
        self.restricted.contains(name)
    }

    /// Check if a name is dangerous
    pub fn is_dangerous(&self, name: &str) -> bool {
        self.dangerous.contains(name)
    }

    /// Check if a name is marked remote-safe
    pub fn is_remote_safe(&self, name: &str) -> bool {
        self.remote_safe.contains(name)
    }

    /// Whether remote code may load `name`.
    ///
    /// The caller must also confirm `name` is a registered builtin.
    pub fn allows_remote(&self, name: &str) -> bool {
        self.is_remote_safe(name) && !self.is_restricted(name) && !self.is_dangerous(name)
    }
}
