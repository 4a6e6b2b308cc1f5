// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `@encoding/utf8` - strings to and from UTF-8 byte arrays

use crate::module_system::Capability;
use crate::modules::{byte_array, define_function, read_bytes};
use boa_engine::{
    Context, JsArgs, JsNativeError, JsObject, JsResult, JsString, JsValue, NativeFunction,
};

/// Builtin name
pub const NAME: &str = "@encoding/utf8";

/// UTF-8 codec
pub struct Utf8;

impl Capability for Utf8 {
    fn populate(&self, exports: &JsObject, context: &mut Context) -> JsResult<()> {
        define_function(exports, "encode", 1, NativeFunction::from_fn_ptr(encode), context)?;
        define_function(exports, "decode", 1, NativeFunction::from_fn_ptr(decode), context)?;
        Ok(())
    }
}

/// `encode(string)`: lone surrogates cannot be encoded and throw
fn encode(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let text = args
        .get_or_undefined(0)
        .to_string(context)?
        .to_std_string()
        .map_err(|_| JsNativeError::typ().with_message("string is not encoded using utf-8"))?;
    Ok(byte_array(text.as_bytes(), context))
}

fn decode(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let bytes = read_bytes(args.get_or_undefined(0), context)?;
    let text = String::from_utf8(bytes)
        .map_err(|_| JsNativeError::typ().with_message("buffer is not a valid utf8 stream"))?;
    Ok(JsString::from(text).into())
}
