// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `@bastion` - engine information

use crate::module_system::Capability;
use boa_engine::{Context, JsObject, JsResult, JsString, js_string};

/// Builtin name
pub const NAME: &str = "@bastion";

/// Exposes the engine version
pub struct Info;

impl Capability for Info {
    fn populate(&self, exports: &JsObject, context: &mut Context) -> JsResult<()> {
        exports.set(
            js_string!("version"),
            JsString::from(crate::VERSION),
            true,
            context,
        )?;
        Ok(())
    }
}
