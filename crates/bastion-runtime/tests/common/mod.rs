// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Shared fixtures: anchor directories and a small HTTP module server

#![allow(dead_code)]

use bastion_runtime::{Engine, EngineConfig};
use boa_engine::JsValue;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Write `source` to `relative` under `root`, creating directories
pub fn write_module(root: &Path, relative: &str, source: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, source).unwrap();
}

/// Fresh anchor directory
pub fn anchor_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Engine anchored at `root` with a short fetch timeout
pub fn engine_at(root: &Path) -> Engine {
    let config = EngineConfig::default()
        .with_anchor(root)
        .with_fetch_timeout(Duration::from_secs(1));
    Engine::with_config(config).unwrap()
}

/// Evaluate and convert the result with `String(value)`
pub fn eval_string(engine: &mut Engine, code: &str) -> String {
    let value = engine.eval(code).unwrap();
    to_string(engine, &value)
}

/// `String(value)` from the host side
pub fn to_string(engine: &mut Engine, value: &JsValue) -> String {
    value
        .to_string(engine.context_mut())
        .unwrap()
        .to_std_string_escaped()
}

/// How the test server answers one path
#[derive(Clone, Debug)]
pub enum Route {
    /// Fixed status, body and extra headers
    Static {
        status: u16,
        body: String,
        headers: Vec<(String, String)>,
    },
    /// 200 after a delay
    Slow { delay: Duration, body: String },
    /// Reflects method, `x-test` header and body as JSON
    Echo,
}

impl Route {
    /// A 200 response carrying `body`
    pub fn ok(body: &str) -> Self {
        Route::Static {
            status: 200,
            body: body.to_string(),
            headers: Vec::new(),
        }
    }

    /// A redirect to `location`
    pub fn redirect(location: &str) -> Self {
        Route::Static {
            status: 302,
            body: String::new(),
            headers: vec![("location".to_string(), location.to_string())],
        }
    }
}

/// HTTP server running on a background thread for the life of the test
/// process
pub struct TestServer {
    addr: SocketAddr,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    hits: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// Serve `routes` (path to route) on an ephemeral local port
    pub fn start(routes: Vec<(&str, Route)>) -> Self {
        let routes: Arc<Mutex<HashMap<String, Route>>> = Arc::new(Mutex::new(
            routes
                .into_iter()
                .map(|(path, route)| (path.to_string(), route))
                .collect(),
        ));
        let hits = Arc::new(Mutex::new(Vec::new()));

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        let server_routes = Arc::clone(&routes);
        let server_hits = Arc::clone(&hits);
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        continue;
                    };
                    let routes = Arc::clone(&server_routes);
                    let hits = Arc::clone(&server_hits);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service = service_fn(move |req| {
                            handle(req, Arc::clone(&routes), Arc::clone(&hits))
                        });
                        let _ = http1::Builder::new().serve_connection(io, service).await;
                    });
                }
            });
        });

        Self { addr, routes, hits }
    }

    /// Add or replace a route while the server runs
    pub fn add_route(&self, path: &str, route: Route) {
        self.routes.lock().unwrap().insert(path.to_string(), route);
    }

    /// `127.0.0.1:<port>`
    pub fn authority(&self) -> String {
        self.addr.to_string()
    }

    /// `http://127.0.0.1:<port><path>`
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Paths requested so far, in order
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

async fn handle(
    req: Request<Incoming>,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    hits: Arc<Mutex<Vec<String>>>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    hits.lock().unwrap().push(path.clone());

    let route = routes.lock().unwrap().get(&path).cloned();
    let response = match route {
        Some(Route::Static {
            status,
            body,
            headers,
        }) => {
            let mut builder = Response::builder().status(status);
            for (name, value) in headers {
                builder = builder.header(name, value);
            }
            builder.body(Full::new(Bytes::from(body))).unwrap()
        }
        Some(Route::Slow { delay, body }) => {
            tokio::time::sleep(delay).await;
            Response::new(Full::new(Bytes::from(body)))
        }
        Some(Route::Echo) => {
            let method = req.method().to_string();
            let header = req
                .headers()
                .get("x-test")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let body = req
                .into_body()
                .collect()
                .await
                .map(|collected| collected.to_bytes())
                .unwrap_or_default();
            let reply = format!(
                r#"{{"method":{:?},"header":{:?},"body":{:?}}}"#,
                method,
                header,
                String::from_utf8_lossy(&body)
            );
            Response::builder()
                .header("content-type", "application/json")
                .header("x-reply", "one")
                .header("x-reply", "two")
                .body(Full::new(Bytes::from(reply)))
                .unwrap()
        }
        None => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap(),
    };
    Ok(response)
}
