// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module body sandboxing
//!
//! Every local or remote module runs as the body of a fresh function taking
//! `(exports, require)`:
//!
//! 1. the `require` handed to the body is frozen before the body starts,
//! 2. the body fills `exports` during its own top-level execution,
//! 3. `exports` is frozen as soon as the body returns.
//!
//! The body is compiled through the realm's `Function` intrinsic rather than
//! by string concatenation, so source text cannot close the wrapper early and
//! run statements outside of it.

use crate::error::RequireError;
use boa_engine::object::IntegrityLevel;
use boa_engine::object::builtins::JsFunction;
use boa_engine::{Context, JsNativeError, JsObject, JsResult, JsString, JsValue, js_string};
use tracing::trace;

/// Directive prepended to every module body
const STRICT_PRELUDE: &str = "'use strict';\n";

/// Freeze an object, failing if the engine refuses.
pub fn freeze(object: &JsObject, context: &mut Context) -> JsResult<()> {
    if object.set_integrity_level(IntegrityLevel::Frozen, context)? {
        Ok(())
    } else {
        Err(JsNativeError::typ()
            .with_message("object cannot be frozen")
            .into())
    }
}

/// Check if an object is frozen
pub fn is_frozen(object: &JsObject, context: &mut Context) -> JsResult<bool> {
    object.test_integrity_level(IntegrityLevel::Frozen, context)
}

/// Compile a module body into its wrapper function.
pub fn compile(module: &str, source: &str, context: &mut Context) -> Result<JsObject, RequireError> {
    let body = format!("{STRICT_PRELUDE}{source}");
    let function_ctor = context.intrinsics().constructors().function().constructor();
    let args = [
        JsValue::from(js_string!("exports")),
        JsValue::from(js_string!("require")),
        JsValue::from(JsString::from(body.as_str())),
    ];

    function_ctor
        .construct(&args, None, context)
        .map_err(|e| RequireError::CompileFailure {
            module: module.to_string(),
            message: e.to_string(),
        })
}

/// Run a compiled module body and return its frozen exports.
///
/// Exceptions thrown by the body come back as [`RequireError::Script`],
/// untouched.
pub fn execute(
    module: &str,
    loader: &JsObject,
    require: &JsFunction,
    context: &mut Context,
) -> Result<JsObject, RequireError> {
    freeze(require, context).map_err(RequireError::internal)?;

    let exports = JsObject::with_object_proto(context.intrinsics());
    let this = JsObject::with_object_proto(context.intrinsics());
    this.set(js_string!("exports"), exports.clone(), true, context)
        .map_err(RequireError::internal)?;
    this.set(js_string!("require"), require.clone(), true, context)
        .map_err(RequireError::internal)?;
    freeze(&this, context).map_err(RequireError::internal)?;

    trace!(module, "executing module body");
    loader
        .call(
            &this.into(),
            &[exports.clone().into(), require.clone().into()],
            context,
        )
        .map_err(RequireError::Script)?;

    freeze(&exports, context).map_err(RequireError::internal)?;
    Ok(exports)
}

/// Compile and run a module body in one step.
pub fn run_module(
    module: &str,
    source: &str,
    require: &JsFunction,
    context: &mut Context,
) -> Result<JsObject, RequireError> {
    let loader = compile(module, source, context)?;
    execute(module, &loader, require, context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boa_engine::NativeFunction;
    use boa_engine::object::FunctionObjectBuilder;

    fn noop_require(context: &mut Context) -> JsFunction {
        let native = NativeFunction::from_fn_ptr(|_, _, _| Ok(JsValue::undefined()));
        FunctionObjectBuilder::new(context.realm(), native)
            .name(js_string!("require"))
            .length(1)
            .build()
    }

    fn read(exports: &JsObject, key: &str, context: &mut Context) -> JsValue {
        exports.get(JsString::from(key), context).unwrap()
    }

    #[test]
    fn test_exports_and_require_frozen() {
        let mut context = Context::default();
        let require = noop_require(&mut context);
        let exports = run_module(
            "inline.js",
            "exports.blah = '123'; exports.requireFrozen = Object.isFrozen(require);",
            &require,
            &mut context,
        )
        .unwrap();

        assert_eq!(
            read(&exports, "blah", &mut context).as_string().map(JsString::to_std_string_escaped),
            Some("123".to_string())
        );
        assert_eq!(read(&exports, "requireFrozen", &mut context).as_boolean(), Some(true));
        assert!(is_frozen(&exports, &mut context).unwrap());
    }

    #[test]
    fn test_syntax_error_is_compile_failure() {
        let mut context = Context::default();
        let require = noop_require(&mut context);
        let err = run_module("broken.js", "exports.x = ;", &require, &mut context).unwrap_err();
        assert!(matches!(err, RequireError::CompileFailure { .. }), "{err:?}");
    }

    #[test]
    fn test_wrapper_cannot_be_closed_early() {
        let mut context = Context::default();
        let require = noop_require(&mut context);
        let err = run_module(
            "escape.js",
            "}); globalThis.escaped = true; (function () {",
            &require,
            &mut context,
        )
        .unwrap_err();
        assert!(matches!(err, RequireError::CompileFailure { .. }));
        let escaped = context
            .global_object()
            .get(js_string!("escaped"), &mut context)
            .unwrap();
        assert!(escaped.is_undefined());
    }

    #[test]
    fn test_throw_passes_through() {
        let mut context = Context::default();
        let require = noop_require(&mut context);
        let err = run_module(
            "throws.js",
            "throw new Error('boom');",
            &require,
            &mut context,
        )
        .unwrap_err();
        match err {
            RequireError::Script(js) => assert!(js.to_string().contains("boom")),
            other => panic!("expected script error, got {other:?}"),
        }
    }

    #[test]
    fn test_late_mutation_rejected() {
        let mut context = Context::default();
        let require = noop_require(&mut context);
        let exports = run_module(
            "late.js",
            "exports.value = 1;",
            &require,
            &mut context,
        )
        .unwrap();

        assert!(
            exports
                .set(js_string!("extra"), 2, true, &mut context)
                .is_err()
        );
        assert!(read(&exports, "extra", &mut context).is_undefined());
    }
}
