// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `@sleep` - block the calling script

use crate::module_system::Capability;
use crate::modules::define_function;
use boa_engine::{Context, JsArgs, JsNativeError, JsObject, JsResult, JsValue, NativeFunction};
use std::time::Duration;
use tracing::trace;

/// Builtin name
pub const NAME: &str = "@sleep";

/// Blocking sleep
pub struct Sleep;

impl Capability for Sleep {
    fn populate(&self, exports: &JsObject, context: &mut Context) -> JsResult<()> {
        define_function(exports, "sleep", 1, NativeFunction::from_fn_ptr(sleep), context)
    }
}

/// `sleep(seconds)` or `sleep("1m30s")`
fn sleep(_this: &JsValue, args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    let arg = args.get_or_undefined(0);
    let duration = if let Some(text) = arg.as_string() {
        let text = text.to_std_string_escaped();
        parse_duration(&text).map_err(|e| {
            JsNativeError::typ().with_message(format!("{text} is not a valid duration: {e}"))
        })?
    } else if let Some(seconds) = arg.as_number() {
        Duration::try_from_secs_f64(seconds).map_err(|_| {
            JsNativeError::range().with_message(format!("cannot sleep for {seconds} seconds"))
        })?
    } else {
        return Err(JsNativeError::typ()
            .with_message(
                "the argument for the sleep function must be either a duration string or a number of seconds",
            )
            .into());
    };

    trace!(?duration, "sleeping");
    std::thread::sleep(duration);
    Ok(JsValue::undefined())
}

/// Parse a duration such as `300ms`, `1.5h` or `2h45m`.
///
/// Units: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. A bare `0` is allowed;
/// any other number needs a unit. Negative durations are rejected.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    if text == "0" {
        return Ok(Duration::ZERO);
    }
    if text.is_empty() {
        return Err("empty duration".to_string());
    }
    if text.starts_with('-') {
        return Err("negative duration".to_string());
    }

    let mut rest = text.strip_prefix('+').unwrap_or(text);
    let mut total = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() || number == "." {
            return Err("expected a number".to_string());
        }
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid number {number:?}"))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let scale = match unit {
            "ns" => 1e-9,
            "us" | "µs" | "μs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "" => return Err(format!("missing unit after {number}")),
            other => return Err(format!("unknown unit {other:?}")),
        };
        total += value * scale;
        rest = tail;
    }

    Duration::try_from_secs_f64(total).map_err(|e| e.to_string())
}
