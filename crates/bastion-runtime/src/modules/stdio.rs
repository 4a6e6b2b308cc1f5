// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `@stdio` - raw access to the engine's standard streams
//!
//! Arguments are converted with `String(value)` and joined with a space.
//! The `ln` variants add a trailing newline. Every print returns `true`.

use crate::globals::stdio::StdioStreams;
use crate::module_system::Capability;
use crate::modules::define_function;
use boa_engine::{
    Context, JsNativeError, JsObject, JsResult, JsString, JsValue, NativeFunction,
};
use boa_gc::{Finalize, Trace};
use tracing::error;

/// Builtin name
pub const NAME: &str = "@stdio";

/// Print functions bound to one engine's streams
pub struct Stdio {
    streams: StdioStreams,
}

impl Stdio {
    /// Capability writing to `streams`
    pub fn new(streams: StdioStreams) -> Self {
        Self { streams }
    }
}

#[derive(Clone, Copy)]
enum Target {
    Stdout,
    Stderr,
}

#[derive(Trace, Finalize)]
struct PrintBinding {
    streams: StdioStreams,
    #[unsafe_ignore_trace]
    target: Target,
    newline: bool,
}

impl Capability for Stdio {
    fn populate(&self, exports: &JsObject, context: &mut Context) -> JsResult<()> {
        let printers = [
            ("print", Target::Stdout, false),
            ("println", Target::Stdout, true),
            ("eprint", Target::Stderr, false),
            ("eprintln", Target::Stderr, true),
        ];
        for (name, target, newline) in printers {
            let binding = PrintBinding {
                streams: self.streams.clone(),
                target,
                newline,
            };
            let native = NativeFunction::from_copy_closure_with_captures(print, binding);
            define_function(exports, name, 0, native, context)?;
        }

        let native =
            NativeFunction::from_copy_closure_with_captures(read_line, self.streams.clone());
        define_function(exports, "readLine", 0, native, context)?;
        Ok(())
    }
}

fn print(
    _this: &JsValue,
    args: &[JsValue],
    binding: &PrintBinding,
    context: &mut Context,
) -> JsResult<JsValue> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(arg.to_string(context)?.to_std_string_escaped());
    }
    let mut text = parts.join(" ");
    if binding.newline {
        text.push('\n');
    }

    let written = match binding.target {
        Target::Stdout => binding.streams.write_stdout(text.as_bytes()),
        Target::Stderr => binding.streams.write_stderr(text.as_bytes()),
    };
    written.map_err(|e| {
        error!(error = %e, "stdio write failed");
        JsNativeError::error().with_message(format!("unable to write output: {e}"))
    })?;
    Ok(JsValue::from(true))
}

/// `readLine()`: next input line, or `null` at end of input
fn read_line(
    _this: &JsValue,
    _args: &[JsValue],
    streams: &StdioStreams,
    _context: &mut Context,
) -> JsResult<JsValue> {
    match streams.read_line() {
        Ok(Some(line)) => Ok(JsString::from(line).into()),
        Ok(None) => Ok(JsValue::null()),
        Err(e) => Err(JsNativeError::error()
            .with_message(format!("unable to read input: {e}"))
            .into()),
    }
}
