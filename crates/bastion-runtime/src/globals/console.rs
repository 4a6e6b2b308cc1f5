// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The `console` global
//!
//! Every level writes to the engine's stderr. Arguments are rendered as JSON
//! (strings come out quoted), separated by spaces, one line per call.

use crate::globals::stdio::StdioStreams;
use crate::modules::define_function;
use boa_engine::{Context, JsNativeError, JsObject, JsResult, JsValue, NativeFunction, js_string};
use tracing::error;

/// Console methods, all sharing the same output
pub const CONSOLE_LEVELS: &[&str] = &["log", "info", "debug", "warn", "error"];

/// Build the console object writing to `streams`
pub fn create_console(streams: &StdioStreams, context: &mut Context) -> JsResult<JsObject> {
    let console = JsObject::with_object_proto(context.intrinsics());
    for level in CONSOLE_LEVELS {
        let native = NativeFunction::from_copy_closure_with_captures(
            |_this, args, streams: &StdioStreams, context| {
                let line = format_line(args, context)?;
                streams.write_stderr(line.as_bytes()).map_err(|e| {
                    error!(error = %e, "console write failed");
                    JsNativeError::error()
                        .with_message(format!("Unable to process call to console: {e}"))
                })?;
                Ok(JsValue::undefined())
            },
            streams.clone(),
        );
        define_function(&console, level, 0, native, context)?;
    }
    Ok(console)
}

/// Render call arguments as one output line
pub fn format_line(args: &[JsValue], context: &mut Context) -> JsResult<String> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(render(arg, context)?);
    }
    let mut line = parts.join(" ");
    line.push('\n');
    Ok(line)
}

fn render(value: &JsValue, context: &mut Context) -> JsResult<String> {
    let json = context.global_object().get(js_string!("JSON"), context)?;
    let Some(json) = json.as_object() else {
        return Ok(value.display().to_string());
    };
    let stringify = json.get(js_string!("stringify"), context)?;
    let Some(stringify) = stringify.as_callable() else {
        return Ok(value.display().to_string());
    };

    // Cyclic values and BigInts make stringify throw; show them as-is instead.
    match stringify.call(&json.clone().into(), &[value.clone()], context) {
        Ok(rendered) => match rendered.as_string() {
            Some(text) => Ok(text.to_std_string_escaped()),
            None => Ok(value.display().to_string()),
        },
        Err(_) => Ok(value.display().to_string()),
    }
}
