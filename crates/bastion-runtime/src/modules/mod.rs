// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Builtin capabilities shipped with the engine
//!
//! | name             | trust       |
//! |------------------|-------------|
//! | `@bastion`       | remote-safe |
//! | `@encoding/utf8` | remote-safe |
//! | `@uuid`          | remote-safe |
//! | `@stdio`         | trusted     |
//! | `@sleep`         | trusted     |
//! | `@rawexec`       | dangerous   |
//! | `@rawfetch`      | dangerous   |

pub mod info;
pub mod rawexec;
pub mod rawfetch;
pub mod sleep;
pub mod stdio;
pub mod utf8;
pub mod uuid;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::globals::stdio::StdioStreams;
use crate::module_system::{CapabilityFlags, TrustGate};
use boa_engine::object::FunctionObjectBuilder;
use boa_engine::object::builtins::JsArray;
use boa_engine::{
    Context, JsArgs, JsNativeError, JsObject, JsResult, JsString, JsValue, NativeFunction,
    js_string,
};

/// Names of every default capability
pub const DEFAULT_MODULES: &[&str] = &[
    info::NAME,
    utf8::NAME,
    uuid::NAME,
    stdio::NAME,
    sleep::NAME,
    rawexec::NAME,
    rawfetch::NAME,
];

/// Register the default capabilities with their trust flags
pub fn register_defaults(
    gate: &TrustGate,
    streams: &StdioStreams,
    config: &EngineConfig,
    context: &mut Context,
) -> Result<()> {
    gate.register_builtin(info::NAME, &info::Info, CapabilityFlags::REMOTE_SAFE, context)?;
    gate.register_builtin(utf8::NAME, &utf8::Utf8, CapabilityFlags::REMOTE_SAFE, context)?;
    gate.register_builtin(
        uuid::NAME,
        &uuid::UuidGenerator,
        CapabilityFlags::REMOTE_SAFE,
        context,
    )?;
    gate.register_builtin(
        stdio::NAME,
        &stdio::Stdio::new(streams.clone()),
        CapabilityFlags::PLAIN,
        context,
    )?;
    gate.register_builtin(sleep::NAME, &sleep::Sleep, CapabilityFlags::PLAIN, context)?;
    gate.register_builtin(
        rawexec::NAME,
        &rawexec::RawExec,
        CapabilityFlags::DANGEROUS,
        context,
    )?;
    gate.register_builtin(
        rawfetch::NAME,
        &rawfetch::RawFetch::new(config),
        CapabilityFlags::DANGEROUS,
        context,
    )?;
    Ok(())
}

/// Set a named native function on `target`
pub fn define_function(
    target: &JsObject,
    name: &str,
    length: usize,
    native: NativeFunction,
    context: &mut Context,
) -> JsResult<()> {
    let function = FunctionObjectBuilder::new(context.realm(), native)
        .name(JsString::from(name))
        .length(length)
        .build();
    target.set(JsString::from(name), function, true, context)?;
    Ok(())
}

/// Argument `index` converted to a Rust string
pub(crate) fn string_arg(args: &[JsValue], index: usize, context: &mut Context) -> JsResult<String> {
    Ok(args
        .get_or_undefined(index)
        .to_string(context)?
        .to_std_string_escaped())
}

/// Bytes as a plain array of numbers
pub(crate) fn byte_array(bytes: &[u8], context: &mut Context) -> JsValue {
    JsArray::from_iter(bytes.iter().map(|b| JsValue::from(*b)), context).into()
}

/// Read an array-like of integers in `0..=255` (arrays, typed arrays)
pub(crate) fn read_bytes(value: &JsValue, context: &mut Context) -> JsResult<Vec<u8>> {
    let Some(object) = value.as_object() else {
        return Err(JsNativeError::typ()
            .with_message("expected an array of bytes")
            .into());
    };
    let length = object.get(js_string!("length"), context)?.to_length(context)?;
    let mut bytes = Vec::with_capacity(length.min(1 << 20) as usize);
    for index in 0..length {
        let item = object.get(index, context)?.to_number(context)?;
        if item.fract() != 0.0 || !(0.0..=255.0).contains(&item) {
            return Err(JsNativeError::range()
                .with_message(format!("byte at index {index} is out of range: {item}"))
                .into());
        }
        bytes.push(item as u8);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boa_engine::Source;

    #[test]
    fn test_read_bytes_accepts_arrays_and_typed_arrays() {
        let mut context = Context::default();
        let value = context.eval(Source::from_bytes("[104, 105]")).unwrap();
        assert_eq!(read_bytes(&value, &mut context).unwrap(), b"hi");

        let value = context
            .eval(Source::from_bytes("new Uint8Array([1, 2, 3])"))
            .unwrap();
        assert_eq!(read_bytes(&value, &mut context).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_read_bytes_rejects_bad_input() {
        let mut context = Context::default();
        for code in ["[256]", "[-1]", "[1.5]", "'text'"] {
            let value = context.eval(Source::from_bytes(code)).unwrap();
            assert!(read_bytes(&value, &mut context).is_err(), "{code}");
        }
    }

    #[test]
    fn test_byte_array_round_trips_through_script() {
        let mut context = Context::default();
        let array = byte_array(b"ok", &mut context);
        context
            .global_object()
            .set(js_string!("bytes"), array, true, &mut context)
            .unwrap();
        let joined = context
            .eval(Source::from_bytes("bytes.join(',')"))
            .unwrap()
            .to_string(&mut context)
            .unwrap()
            .to_std_string_escaped();
        assert_eq!(joined, "111,107");
    }
}
