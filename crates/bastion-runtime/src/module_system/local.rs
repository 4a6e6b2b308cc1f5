// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Trusted file modules resolved under the anchor root

use crate::error::RequireError;
use crate::module_system::cache::ModuleKey;
use crate::module_system::gate::{Scope, TrustGate};
use crate::module_system::specifier::strip_suffixes;
use boa_engine::{Context, JsObject};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Resolution scope for local modules.
///
/// `dir` is relative to the anchor root and always normalized; the root
/// scope has an empty `dir`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalScope {
    dir: PathBuf,
}

impl LocalScope {
    /// Scope at the anchor root
    pub fn root() -> Self {
        Self::default()
    }

    /// Scope for modules required by the file at `relative`
    pub fn for_module(relative: &Path) -> Self {
        Self {
            dir: relative.parent().map(Path::to_path_buf).unwrap_or_default(),
        }
    }

    /// Join `name` onto this scope's directory, lexically.
    ///
    /// A leading `/` restarts from the anchor root. Climbing above the root
    /// with `..` is refused before anything touches the filesystem.
    pub fn resolve(&self, name: &str, anchor: &Path) -> Result<PathBuf, RequireError> {
        let path = strip_suffixes(name);
        let mut segments: Vec<String> = if path.starts_with('/') {
            Vec::new()
        } else {
            self.dir
                .iter()
                .map(|s| s.to_string_lossy().into_owned())
                .collect()
        };

        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        let escaped = anchor.join(&self.dir).join(path);
                        warn!(module = name, path = %escaped.display(), "local module escapes anchor root");
                        return Err(RequireError::AccessDenied {
                            module: name.to_string(),
                            path: escaped,
                        });
                    }
                }
                other => segments.push(other.to_string()),
            }
        }

        Ok(segments.iter().collect())
    }

    /// Load a local module relative to this scope.
    pub(crate) fn require(
        &self,
        gate: &TrustGate,
        name: &str,
        context: &mut Context,
    ) -> Result<JsObject, RequireError> {
        let anchor = gate.anchor();
        let relative = self.resolve(name, &anchor)?;
        let absolute = anchor.join(&relative);
        debug!(module = name, path = %absolute.display(), "resolved local module");

        let child = Scope::Local(Self::for_module(&relative));
        gate.load_module(ModuleKey::Local(absolute), name, child, context, |gate| {
            gate.read_local(name, &relative)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_from_root() {
        let anchor = Path::new("/srv/scripts");
        let root = LocalScope::root();
        assert_eq!(root.resolve("mymod.js", anchor).unwrap(), PathBuf::from("mymod.js"));
        assert_eq!(
            root.resolve("./lib/../lib/a.js", anchor).unwrap(),
            PathBuf::from("lib/a.js")
        );
    }

    #[test]
    fn test_resolve_nested() {
        let anchor = Path::new("/srv/scripts");
        let scope = LocalScope::for_module(Path::new("lib/deep/a.js"));
        assert_eq!(
            scope.resolve("b.js", anchor).unwrap(),
            PathBuf::from("lib/deep/b.js")
        );
        assert_eq!(
            scope.resolve("../sibling.js", anchor).unwrap(),
            PathBuf::from("lib/sibling.js")
        );
        assert_eq!(
            scope.resolve("/top.js", anchor).unwrap(),
            PathBuf::from("top.js")
        );
    }

    #[test]
    fn test_escape_denied() {
        let anchor = Path::new("/srv/scripts");
        let scope = LocalScope::for_module(Path::new("lib/a.js"));
        assert!(scope.resolve("../ok.js", anchor).is_ok());

        let err = scope.resolve("../../etc/passwd.js", anchor).unwrap_err();
        match err {
            RequireError::AccessDenied { module, .. } => assert_eq!(module, "../../etc/passwd.js"),
            other => panic!("expected access denied, got {other:?}"),
        }
        assert!(LocalScope::root().resolve("/../x.js", anchor).is_err());
    }

    #[test]
    fn test_for_module_at_root() {
        assert_eq!(LocalScope::for_module(Path::new("a.js")), LocalScope::root());
    }
}
