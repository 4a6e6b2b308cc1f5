// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the runtime

use boa_engine::JsError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for host-facing engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced by a single `require` call.
///
/// None of these are cached: the next `require` of the same module retries
/// from scratch.
#[derive(Debug, Error)]
pub enum RequireError {
    /// Module blocked by the engine's trust state
    #[error("Module {0} is restricted")]
    ModuleRestricted(String),

    /// Builtin requested by remote code without being cleared for it
    #[error("Module {0} is not allowed from remote hosts")]
    RemoteNotAllowed(String),

    /// Specifier matched none of the builtin/local/remote grammars
    #[error("Path {0} is not understood as a valid module path")]
    InvalidSpecifier(String),

    /// Builtin name that was never registered
    #[error("Module {0} not defined")]
    NotFound(String),

    /// Local path resolved outside the anchor root
    #[error("Access to {module} denied: {path} is outside the module root")]
    AccessDenied {
        /// Module specifier
        module: String,
        /// Offending path
        path: PathBuf,
    },

    /// Local source could not be read
    #[error("Unable to load {module}: {reason}")]
    LoadFailure {
        /// Module specifier
        module: String,
        /// Reason for failure
        reason: String,
    },

    /// Source failed to parse
    #[error("Unable to parse {module}: {message}")]
    CompileFailure {
        /// Module specifier
        module: String,
        /// Parser message
        message: String,
    },

    /// Fetch attempted outside the loader's pinned origin
    #[error("Cannot download {url}: origin differs from pinned origin {origin}")]
    SecurityViolation {
        /// Target URL
        url: String,
        /// Pinned origin of the loader
        origin: String,
    },

    /// Network error or non-200 response
    #[error("Unable to fetch {url}: {reason}")]
    FetchFailure {
        /// Target URL
        url: String,
        /// Reason for failure
        reason: String,
    },

    /// Module required itself while still loading
    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    /// Exception thrown by a module body, passed through as-is
    #[error("{0}")]
    Script(JsError),

    /// Engine-side JavaScript operation failed
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RequireError {
    /// Create a load failure error
    pub fn load_failure(module: impl Into<String>, reason: impl ToString) -> Self {
        Self::LoadFailure {
            module: module.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a fetch failure error
    pub fn fetch_failure(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::FetchFailure {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an internal error from an engine error
    pub fn internal(err: impl ToString) -> Self {
        Self::Internal(err.to_string())
    }

    /// Whether the error came from the trust state rather than from loading
    pub fn is_restricted(&self) -> bool {
        matches!(self, Self::ModuleRestricted(_) | Self::RemoteNotAllowed(_))
    }

    /// Stable code attached to the JS error object thrown into scripts
    pub fn code(&self) -> &'static str {
        match self {
            Self::ModuleRestricted(_) => "ERR_MODULE_RESTRICTED",
            Self::RemoteNotAllowed(_) => "ERR_REMOTE_NOT_ALLOWED",
            Self::InvalidSpecifier(_) => "ERR_INVALID_SPECIFIER",
            Self::NotFound(_) => "ERR_MODULE_NOT_FOUND",
            Self::AccessDenied { .. } => "ERR_ACCESS_DENIED",
            Self::LoadFailure { .. } => "ERR_LOAD_FAILURE",
            Self::CompileFailure { .. } => "ERR_COMPILE_FAILURE",
            Self::SecurityViolation { .. } => "ERR_SECURITY_VIOLATION",
            Self::FetchFailure { .. } => "ERR_FETCH_FAILURE",
            Self::CircularDependency(_) => "ERR_CIRCULAR_DEPENDENCY",
            Self::Script(_) => "ERR_SCRIPT",
            Self::Internal(_) => "ERR_INTERNAL",
        }
    }
}

/// Errors that can occur while building or driving an engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Intrinsic freezing or global installation failed; the engine is unusable
    #[error("Engine bootstrap failed: {0}")]
    Bootstrap(String),

    /// Builtin registration error
    #[error("Cannot register module {name}: {reason}")]
    Registration {
        /// Builtin name
        name: String,
        /// Reason for failure
        reason: String,
    },

    /// Module loading error
    #[error(transparent)]
    Require(#[from] RequireError),

    /// Uncaught exception from evaluated code
    #[error("Uncaught {0}")]
    Script(JsError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// File system error
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create a registration error
    pub fn registration(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Registration {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error was caused by a restricted module
    pub fn is_restricted_module(&self) -> bool {
        matches!(self, Self::Require(err) if err.is_restricted())
    }

    /// The module loading error, if any
    pub fn as_require(&self) -> Option<&RequireError> {
        match self {
            Self::Require(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restricted_classification() {
        assert!(RequireError::ModuleRestricted("@rawexec".into()).is_restricted());
        assert!(RequireError::RemoteNotAllowed("@stdio".into()).is_restricted());
        assert!(!RequireError::NotFound("@nope".into()).is_restricted());

        let err = EngineError::from(RequireError::ModuleRestricted("@rawexec".into()));
        assert!(err.is_restricted_module());
        assert!(!EngineError::Config("x".into()).is_restricted_module());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            RequireError::ModuleRestricted("@rawexec".into()).to_string(),
            "Module @rawexec is restricted"
        );
        assert_eq!(
            RequireError::fetch_failure("http://a/b.js", "status 404").to_string(),
            "Unable to fetch http://a/b.js: status 404"
        );
        assert_eq!(RequireError::InvalidSpecifier("x".into()).code(), "ERR_INVALID_SPECIFIER");
    }
}
