// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EngineError, Result};

/// Default timeout for remote module downloads, in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default upper bound for a single module's source
pub const DEFAULT_MAX_MODULE_BYTES: u64 = 8 * 1024 * 1024;

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory local modules are resolved under
    pub anchor: PathBuf,

    /// Remote fetch timeout in seconds
    pub fetch_timeout_secs: u64,

    /// User agent sent with remote module requests
    pub user_agent: String,

    /// Largest module source accepted, in bytes
    pub max_module_bytes: u64,

    /// Builtins to unrestrict right after construction
    pub unrestricted: Vec<String>,

    /// Whether to register the default builtin modules
    pub with_default_modules: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            anchor: PathBuf::from("."),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            user_agent: format!("bastion/{}", crate::VERSION),
            max_module_bytes: DEFAULT_MAX_MODULE_BYTES,
            unrestricted: Vec::new(),
            with_default_modules: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_secs == 0 {
            return Err(EngineError::Config(
                "fetch_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_module_bytes == 0 {
            return Err(EngineError::Config(
                "max_module_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Remote fetch timeout
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Set the anchor directory
    pub fn with_anchor(mut self, anchor: impl Into<PathBuf>) -> Self {
        self.anchor = anchor.into();
        self
    }

    /// Set the remote fetch timeout
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_secs = timeout.as_secs().max(1);
        self
    }
}
