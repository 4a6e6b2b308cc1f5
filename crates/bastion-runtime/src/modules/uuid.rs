// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `@uuid` - random and name-based identifiers

use crate::module_system::Capability;
use crate::modules::{define_function, read_bytes, string_arg};
use ::uuid::Uuid;
use boa_engine::{
    Context, JsArgs, JsNativeError, JsObject, JsResult, JsString, JsValue, NativeFunction,
};

/// Builtin name
pub const NAME: &str = "@uuid";

/// UUID generation
pub struct UuidGenerator;

impl Capability for UuidGenerator {
    fn populate(&self, exports: &JsObject, context: &mut Context) -> JsResult<()> {
        define_function(exports, "v4", 0, NativeFunction::from_fn_ptr(v4), context)?;
        define_function(exports, "v5", 2, NativeFunction::from_fn_ptr(v5), context)?;
        Ok(())
    }
}

fn v4(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(JsString::from(Uuid::new_v4().to_string()).into())
}

/// `v5(namespace, name)`: `name` is a string or an array of bytes
fn v5(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let namespace = string_arg(args, 0, context)?;
    let namespace = Uuid::parse_str(&namespace)
        .map_err(|_| JsNativeError::typ().with_message("value is not a valid UUID"))?;

    let name = args.get_or_undefined(1);
    let name = if name.is_object() {
        read_bytes(name, context)?
    } else {
        string_arg(args, 1, context)?.into_bytes()
    };
    Ok(JsString::from(Uuid::new_v5(&namespace, &name).to_string()).into())
}
