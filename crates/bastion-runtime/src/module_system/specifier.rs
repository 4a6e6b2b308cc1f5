// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module specifier grammar

use crate::error::RequireError;
use url::{ParseError, Url};

/// Prefix reserved for builtin module names
pub const BUILTIN_PREFIX: char = '@';

/// Extension every local and remote module path must carry
pub const SCRIPT_EXTENSION: &str = ".js";

/// A classified `require` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Specifier {
    /// Native capability (`@name`)
    Builtin(String),
    /// Trusted file under the anchor root
    Local(String),
    /// Untrusted module behind a URL
    Remote(Url),
}

impl Specifier {
    /// Classify a specifier by grammar.
    pub fn classify(name: &str) -> Result<Self, RequireError> {
        if is_builtin(name) {
            return Ok(Specifier::Builtin(name.to_string()));
        }

        match Url::parse(name) {
            Ok(url) if has_script_extension(url.path()) => Ok(Specifier::Remote(url)),
            Err(ParseError::RelativeUrlWithoutBase) if has_script_extension(strip_suffixes(name)) => {
                Ok(Specifier::Local(name.to_string()))
            }
            _ => Err(RequireError::InvalidSpecifier(name.to_string())),
        }
    }

    /// Trust tier name, used in logs
    pub fn tier(&self) -> &'static str {
        match self {
            Specifier::Builtin(_) => "builtin",
            Specifier::Local(_) => "local",
            Specifier::Remote(_) => "remote",
        }
    }
}

/// Check if a name follows the builtin naming convention
pub fn is_builtin(name: &str) -> bool {
    name.starts_with(BUILTIN_PREFIX)
}

/// Check if a builtin name is acceptable for registration
pub fn is_valid_builtin_name(name: &str) -> bool {
    is_builtin(name) && name.len() > BUILTIN_PREFIX.len_utf8() && !name.contains(char::is_whitespace)
}

/// Whether the cleaned path names a script file
pub fn has_script_extension(path: &str) -> bool {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    // A trailing slash names a directory even if the last segment looks like a file
    if path.ends_with('/') {
        return false;
    }
    segments
        .last()
        .is_some_and(|last| last.len() > SCRIPT_EXTENSION.len() && last.ends_with(SCRIPT_EXTENSION))
}

/// Drop any query string or fragment from a relative reference
pub fn strip_suffixes(name: &str) -> &str {
    name.split(['?', '#']).next().unwrap_or(name)
}
