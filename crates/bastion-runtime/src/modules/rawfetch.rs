// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `@rawfetch` - unrestricted HTTP client for trusted scripts
//!
//! Unlike remote module loading, requests made here may go anywhere and
//! follow redirects. Failures are logged in full; scripts only see a generic
//! message.

use crate::config::EngineConfig;
use crate::module_system::Capability;
use crate::modules::{byte_array, define_function, read_bytes, string_arg};
use boa_engine::object::builtins::JsArray;
use boa_engine::{
    Context, JsArgs, JsError, JsNativeError, JsObject, JsResult, JsString, JsValue,
    NativeFunction, js_string,
};
use boa_gc::{Finalize, Trace};
use reqwest::Method;
use reqwest::blocking::{Client, Response};
use std::cell::OnceCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, error};

/// Builtin name
pub const NAME: &str = "@rawfetch";

const FETCH_ERROR: &str =
    "Unable to fetch resources from HTTP endpoint. Check logs for more information";

/// HTTP client sharing one lazily built connection pool
#[derive(Debug)]
struct LazyClient {
    client: OnceCell<Client>,
    timeout: Duration,
    user_agent: String,
}

impl LazyClient {
    fn get(&self) -> reqwest::Result<&Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .build()?;
        Ok(self.client.get_or_init(|| client))
    }
}

#[derive(Trace, Finalize)]
struct FetchBinding {
    #[unsafe_ignore_trace]
    client: Rc<LazyClient>,
}

/// Raw HTTP access
pub struct RawFetch {
    client: Rc<LazyClient>,
}

impl RawFetch {
    /// Capability using the engine's fetch timeout and user agent
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            client: Rc::new(LazyClient {
                client: OnceCell::new(),
                timeout: config.fetch_timeout(),
                user_agent: config.user_agent.clone(),
            }),
        }
    }

    fn binding(&self) -> FetchBinding {
        FetchBinding {
            client: self.client.clone(),
        }
    }
}

impl Capability for RawFetch {
    fn populate(&self, exports: &JsObject, context: &mut Context) -> JsResult<()> {
        let native = NativeFunction::from_copy_closure_with_captures(get_json, self.binding());
        define_function(exports, "getJSON", 1, native, context)?;
        let native = NativeFunction::from_copy_closure_with_captures(do_http, self.binding());
        define_function(exports, "doHTTP", 2, native, context)?;
        Ok(())
    }
}

fn fetch_error() -> JsError {
    JsNativeError::error().with_message(FETCH_ERROR).into()
}

/// `getJSON(url)`: GET and decode the body as JSON
fn get_json(
    _this: &JsValue,
    args: &[JsValue],
    binding: &FetchBinding,
    context: &mut Context,
) -> JsResult<JsValue> {
    let target = string_arg(args, 0, context)?;
    debug!(target = %target, "getJSON");

    let bytes = binding
        .client
        .get()
        .and_then(|client| client.get(&target).send())
        .and_then(Response::bytes)
        .map_err(|e| {
            error!(target = %target, error = %e, "unable to call HTTP GET");
            fetch_error()
        })?;
    let body: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
        error!(target = %target, error = %e, "unable to decode response");
        fetch_error()
    })?;
    JsValue::from_json(&body, context)
}

/// Request options accepted by `doHTTP`
#[derive(Debug, Default)]
struct RequestOptions {
    method: Option<String>,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl RequestOptions {
    fn from_value(value: &JsValue, context: &mut Context) -> JsResult<Self> {
        let mut options = Self::default();
        let Some(object) = value.as_object() else {
            return Ok(options);
        };

        let method = object.get(js_string!("method"), context)?;
        if !method.is_undefined() && !method.is_null() {
            options.method = Some(method.to_string(context)?.to_std_string_escaped());
        }

        let headers = object.get(js_string!("headers"), context)?;
        if let Some(headers) = headers.as_object() {
            for key in headers.own_property_keys(context)? {
                let name = key.to_string();
                let values = headers.get(key, context)?;
                if let Some(list) = values.as_object() {
                    let length = list.get(js_string!("length"), context)?.to_length(context)?;
                    for index in 0..length {
                        let item = list.get(index, context)?;
                        options
                            .headers
                            .push((name.clone(), item.to_string(context)?.to_std_string_escaped()));
                    }
                } else {
                    options
                        .headers
                        .push((name, values.to_string(context)?.to_std_string_escaped()));
                }
            }
        }

        let body = object.get(js_string!("body"), context)?;
        options.body = if let Some(text) = body.as_string() {
            Some(text.to_std_string_escaped().into_bytes())
        } else if body.is_object() {
            Some(read_bytes(&body, context)?)
        } else {
            None
        };
        Ok(options)
    }

    fn method(&self) -> JsResult<Method> {
        let name = self.method.as_deref().unwrap_or("GET").to_ascii_uppercase();
        Method::from_bytes(name.as_bytes()).map_err(|_| {
            JsNativeError::typ()
                .with_message(format!("invalid HTTP method {name}"))
                .into()
        })
    }
}

/// `doHTTP(url, {method, headers, body})`
///
/// Resolves to `{statusCode, status, headers, body}` for any status; only
/// transport failures throw.
fn do_http(
    _this: &JsValue,
    args: &[JsValue],
    binding: &FetchBinding,
    context: &mut Context,
) -> JsResult<JsValue> {
    let target = string_arg(args, 0, context)?;
    let options = RequestOptions::from_value(args.get_or_undefined(1), context)?;
    let method = options.method()?;
    debug!(target = %target, %method, "doHTTP");

    let client = binding.client.get().map_err(|e| {
        error!(error = %e, "unable to build HTTP client");
        fetch_error()
    })?;
    let mut request = client.request(method.clone(), &target);
    for (name, value) in &options.headers {
        request = request.header(name, value);
    }
    if let Some(body) = options.body {
        request = request.body(body);
    }

    let response = request.send().map_err(|e| {
        error!(target = %target, %method, error = %e, "unable to perform request");
        fetch_error()
    })?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().map_err(|e| {
        error!(target = %target, %method, error = %e, "unable to read response body");
        fetch_error()
    })?;

    let header_map = JsObject::with_object_proto(context.intrinsics());
    for name in headers.keys() {
        let values = headers
            .get_all(name)
            .iter()
            .map(|value| JsString::from(String::from_utf8_lossy(value.as_bytes()).as_ref()).into())
            .collect::<Vec<JsValue>>();
        let values = JsArray::from_iter(values, context);
        header_map.set(JsString::from(name.as_str()), values, true, context)?;
    }

    let status_text = match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    };

    let result = JsObject::with_object_proto(context.intrinsics());
    result.set(js_string!("statusCode"), JsValue::from(status.as_u16()), true, context)?;
    result.set(js_string!("status"), JsString::from(status_text), true, context)?;
    result.set(js_string!("headers"), header_map, true, context)?;
    let body = byte_array(&body, context);
    result.set(js_string!("body"), body, true, context)?;
    Ok(result.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use boa_engine::Source;

    fn options(code: &str) -> RequestOptions {
        let mut context = Context::default();
        let value = context.eval(Source::from_bytes(code)).unwrap();
        RequestOptions::from_value(&value, &mut context).unwrap()
    }

    #[test]
    fn test_request_options() {
        let parsed = options(
            r#"({ method: "post", headers: { "x-one": "1", "x-many": ["a", "b"] }, body: "hi" })"#,
        );
        assert_eq!(parsed.method().unwrap(), Method::POST);
        assert_eq!(
            parsed.headers,
            vec![
                ("x-one".to_string(), "1".to_string()),
                ("x-many".to_string(), "a".to_string()),
                ("x-many".to_string(), "b".to_string()),
            ]
        );
        assert_eq!(parsed.body.as_deref(), Some(&b"hi"[..]));
    }

    #[test]
    fn test_default_options() {
        let parsed = options("undefined");
        assert_eq!(parsed.method().unwrap(), Method::GET);
        assert!(parsed.headers.is_empty());
        assert!(parsed.body.is_none());

        let parsed = options("({ body: [1, 2] })");
        assert_eq!(parsed.body, Some(vec![1, 2]));
    }

    #[test]
    fn test_invalid_method() {
        assert!(options(r#"({ method: "NOT A METHOD" })"#).method().is_err());
    }

    #[test]
    fn test_unreachable_host_throws_generic_error() {
        let mut context = Context::default();
        let config = EngineConfig::default().with_fetch_timeout(Duration::from_secs(2));
        let exports = crate::module_system::CapabilityRegistry::populate(
            NAME,
            &RawFetch::new(&config),
            &mut context,
        )
        .unwrap();
        context
            .global_object()
            .set(js_string!("fetch"), exports, true, &mut context)
            .unwrap();

        let err = context
            .eval(Source::from_bytes("fetch.getJSON('http://127.0.0.1:9/nothing')"))
            .unwrap_err();
        assert!(err.to_string().contains("Check logs"));
    }
}
