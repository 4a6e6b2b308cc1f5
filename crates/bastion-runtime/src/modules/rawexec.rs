// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `@rawexec` - run host programs
//!
//! ```js
//! const exec = require("@rawexec");
//! const out = exec.call("git", { args: ["status"], input: "" });
//! // out.exitCode, out.stdout (bytes), out.stderr (bytes)
//! ```
//!
//! `call_strict` throws when the program cannot start or exits non-zero.

use crate::module_system::Capability;
use crate::modules::{byte_array, define_function, read_bytes, string_arg};
use boa_engine::{
    Context, JsArgs, JsNativeError, JsObject, JsResult, JsValue, NativeFunction, js_string,
};
use std::io::Write;
use std::process::{Command, Output, Stdio};
use tracing::{debug, error};

/// Builtin name
pub const NAME: &str = "@rawexec";

/// Process execution
pub struct RawExec;

impl Capability for RawExec {
    fn populate(&self, exports: &JsObject, context: &mut Context) -> JsResult<()> {
        define_function(exports, "call", 2, NativeFunction::from_fn_ptr(call), context)?;
        define_function(
            exports,
            "call_strict",
            2,
            NativeFunction::from_fn_ptr(call_strict),
            context,
        )?;
        Ok(())
    }
}

/// A program invocation decoded from script arguments
#[derive(Debug, Default)]
struct Invocation {
    program: String,
    args: Vec<String>,
    input: Option<Vec<u8>>,
}

impl Invocation {
    fn from_args(args: &[JsValue], context: &mut Context) -> JsResult<Self> {
        let mut invocation = Self {
            program: string_arg(args, 0, context)?,
            ..Self::default()
        };

        let Some(options) = args.get_or_undefined(1).as_object() else {
            return Ok(invocation);
        };
        let list = options.get(js_string!("args"), context)?;
        if let Some(list) = list.as_object() {
            let length = list.get(js_string!("length"), context)?.to_length(context)?;
            for index in 0..length {
                let item = list.get(index, context)?;
                invocation
                    .args
                    .push(item.to_string(context)?.to_std_string_escaped());
            }
        }

        let input = options.get(js_string!("input"), context)?;
        invocation.input = if let Some(text) = input.as_string() {
            Some(text.to_std_string_escaped().into_bytes())
        } else if input.is_object() {
            Some(read_bytes(&input, context)?)
        } else {
            None
        };
        Ok(invocation)
    }

    fn run(&self) -> std::io::Result<Output> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(if self.input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn()?;
        if let (Some(input), Some(mut stdin)) = (&self.input, child.stdin.take()) {
            // Programs that exit without reading their input close the pipe early.
            if let Err(e) = stdin.write_all(input) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e);
                }
            }
        }
        child.wait_with_output()
    }
}

fn call(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    execute(args, false, context)
}

fn call_strict(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    execute(args, true, context)
}

fn execute(args: &[JsValue], strict: bool, context: &mut Context) -> JsResult<JsValue> {
    let invocation = Invocation::from_args(args, context)?;
    debug!(program = %invocation.program, args = ?invocation.args, "running host program");

    let output = invocation.run().map_err(|e| {
        error!(program = %invocation.program, error = %e, "unable to start program");
        JsNativeError::error().with_message(format!(
            "Unable to start {}: {e}",
            invocation.program
        ))
    })?;

    // Killed by a signal: no exit code.
    let exit_code = output.status.code().unwrap_or(-1);
    if strict && !output.status.success() {
        error!(
            program = %invocation.program,
            args = ?invocation.args,
            exit_code,
            "command failed with unexpected status"
        );
        return Err(JsNativeError::error()
            .with_message(format!("Command failed with status code {exit_code}"))
            .into());
    }

    let result = JsObject::with_object_proto(context.intrinsics());
    result.set(js_string!("exitCode"), JsValue::from(exit_code), true, context)?;
    let stdout = byte_array(&output.stdout, context);
    result.set(js_string!("stdout"), stdout, true, context)?;
    let stderr = byte_array(&output.stderr, context);
    result.set(js_string!("stderr"), stderr, true, context)?;
    Ok(result.into())
}
