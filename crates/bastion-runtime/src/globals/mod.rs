// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Engine globals and the global freezer
//!
//! Implements:
//! - intrinsic protection, run once per realm before any other code
//! - `console` - JSON-ish output to the engine's stderr
//! - deep-frozen, read-only installation of engine-provided globals
//! - the untrusted realm remote module bodies run in
//!
//! Remote code may hold functions from the trusted realm (builtin exports).
//! The `constructor` of every function prototype is therefore removed, so a
//! function never leads back to the `Function` constructor of its realm.

pub mod console;
pub mod stdio;

use crate::error::{EngineError, Result};
use crate::globals::stdio::StdioStreams;
use boa_engine::property::Attribute;
use boa_engine::realm::Realm;
use boa_engine::{Context, JsObject, JsString, JsValue, Source};
use tracing::debug;

/// Intrinsics frozen at engine construction, together with their prototypes
pub const FROZEN_INTRINSICS: &[&str] = &[
    "Object", "Array", "String", "Number", "Boolean", "Date", "Function", "RegExp", "Math",
    "JSON",
];

const DEEP_FREEZE: &str = r#"(function deepFreeze(value) {
    Object.freeze(value);
    for (const key of Object.getOwnPropertyNames(value)) {
        const child = value[key];
        if ((typeof child === "object" || typeof child === "function")
            && child !== null && !Object.isFrozen(child)) {
            deepFreeze(child);
        }
    }
    return value;
})"#;

fn protect_script() -> String {
    let names = FROZEN_INTRINSICS
        .iter()
        .map(|name| format!("{name:?}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"(function (global) {{
    "use strict";
    const functionPrototypes = [
        Function.prototype,
        Object.getPrototypeOf(async function () {{}}),
        Object.getPrototypeOf(function* () {{}}),
        Object.getPrototypeOf(async function* () {{}}),
    ];
    for (const prototype of functionPrototypes) {{
        Object.defineProperty(prototype, "constructor", {{
            value: undefined,
            writable: false,
            configurable: false,
        }});
        Object.freeze(prototype);
    }}
    for (const name of [{names}]) {{
        const value = global[name];
        if (value === undefined || value === null) {{
            throw new Error("missing intrinsic " + name);
        }}
        Object.defineProperty(global, name, {{ writable: false, configurable: false }});
        Object.freeze(value);
        if (typeof value === "function" && value.prototype) {{
            Object.freeze(value.prototype);
        }}
    }}
}})(globalThis);"#
    )
}

/// Freeze the intrinsic constructors of the current realm and lock their
/// global bindings.
///
/// Must run before any builtin or user code. A failure leaves the engine
/// unusable.
pub fn protect_intrinsics(context: &mut Context) -> Result<()> {
    context
        .eval(Source::from_bytes(protect_script().as_bytes()))
        .map_err(|e| EngineError::Bootstrap(e.to_string()))?;
    debug!(count = FROZEN_INTRINSICS.len(), "intrinsics frozen");
    Ok(())
}

/// Protect the intrinsics of the current realm and install its `console`.
pub fn bootstrap_realm(streams: &StdioStreams, context: &mut Context) -> Result<()> {
    protect_intrinsics(context)?;
    let console = console::create_console(streams, context)
        .map_err(|e| EngineError::Bootstrap(format!("console: {e}")))?;
    install_global("console", console, context)
}

/// Create the realm remote module bodies run in.
///
/// It has its own frozen intrinsics and `console`, and no `require` global.
/// The current realm is left active.
pub fn create_untrusted_realm(streams: &StdioStreams, context: &mut Context) -> Result<Realm> {
    let realm = context
        .create_realm()
        .map_err(|e| EngineError::Bootstrap(format!("untrusted realm: {e}")))?;
    let previous = context.enter_realm(realm.clone());
    let bootstrapped = bootstrap_realm(streams, context);
    context.enter_realm(previous);
    bootstrapped?;
    debug!("untrusted realm ready");
    Ok(realm)
}

/// Deep-freeze `value` and install it as a read-only global.
pub fn install_global(name: &str, value: JsObject, context: &mut Context) -> Result<()> {
    let bootstrap = |e: boa_engine::JsError| EngineError::Bootstrap(format!("global {name}: {e}"));

    let deep_freeze = context
        .eval(Source::from_bytes(DEEP_FREEZE))
        .map_err(bootstrap)?;
    let deep_freeze = deep_freeze
        .as_callable()
        .cloned()
        .ok_or_else(|| EngineError::Bootstrap("deep freeze helper is not callable".to_string()))?;
    deep_freeze
        .call(&JsValue::undefined(), &[value.clone().into()], context)
        .map_err(bootstrap)?;

    context
        .register_global_property(JsString::from(name), value, Attribute::ENUMERABLE)
        .map_err(bootstrap)?;
    debug!(global = name, "installed frozen global");
    Ok(())
}
