// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Untrusted modules fetched over HTTP

mod common;

use bastion_runtime::{Capability, RequireError};
use boa_engine::{Context, JsObject, JsResult, js_string};
use common::{Route, TestServer, anchor_dir, engine_at, eval_string, write_module};
use std::time::Duration;

fn module_server() -> TestServer {
    TestServer::start(vec![
        ("/mods/valid.js", Route::ok("exports.submod = require('./submod.js');")),
        ("/mods/submod.js", Route::ok("exports.msg = 'other';")),
        ("/mods/invalid.js", Route::ok("exports.exec = require('@rawexec');")),
        ("/mods/stdio.js", Route::ok("exports.io = require('@stdio');")),
        (
            "/mods/uuid.js",
            Route::ok("exports.id = require('@uuid').v4(); exports.version = require('@bastion').version;"),
        ),
        ("/mods/local.js", Route::ok("exports.x = require('lib/a.js');")),
        ("/mods/deep/child.js", Route::ok("exports.up = require('../submod.js').msg;")),
        ("/mods/throws.js", Route::ok("throw new Error('remote failure');")),
        ("/mods/moved.js", Route::redirect("/mods/submod.js")),
        (
            "/mods/slow.js",
            Route::Slow {
                delay: Duration::from_secs(3),
                body: "exports.late = true;".to_string(),
            },
        ),
    ])
}

#[test]
fn test_relative_remote_require() {
    let server = module_server();
    let dir = anchor_dir();
    let mut engine = engine_at(dir.path());

    let code = format!(
        "const result = require('{}'); result.submod.msg",
        server.url("/mods/valid.js")
    );
    assert_eq!(eval_string(&mut engine, &code), "other");

    let code = format!("require('{}').up", server.url("/mods/deep/child.js"));
    assert_eq!(eval_string(&mut engine, &code), "other");
    // submod.js was served once and then cached
    let fetched = server
        .hits()
        .iter()
        .filter(|path| path.as_str() == "/mods/submod.js")
        .count();
    assert_eq!(fetched, 1);
}

#[test]
fn test_remote_cannot_use_dangerous_builtin() {
    let server = module_server();
    let dir = anchor_dir();
    let mut engine = engine_at(dir.path());
    engine.unrestrict("@rawexec");

    let err = engine
        .eval(&format!("require('{}')", server.url("/mods/invalid.js")))
        .unwrap_err();
    assert!(matches!(
        err.as_require(),
        Some(RequireError::RemoteNotAllowed(name)) if name == "@rawexec"
    ));
    assert!(err.is_restricted_module());
}

#[test]
fn test_remote_cannot_use_trusted_builtin() {
    let server = module_server();
    let dir = anchor_dir();
    let mut engine = engine_at(dir.path());

    assert!(matches!(
        engine.require(&server.url("/mods/stdio.js")),
        Err(RequireError::RemoteNotAllowed(_))
    ));
}

#[test]
fn test_remote_safe_builtins_are_available() {
    let server = module_server();
    let dir = anchor_dir();
    let mut engine = engine_at(dir.path());

    let code = format!(
        "const m = require('{}'); m.id.length === 36 && m.version === require('@bastion').version",
        server.url("/mods/uuid.js")
    );
    assert_eq!(eval_string(&mut engine, &code), "true");

    engine.restrict("@uuid");
    let other = module_server();
    assert!(matches!(
        engine.require(&other.url("/mods/uuid.js")),
        Err(RequireError::RemoteNotAllowed(_))
    ));
}

#[test]
fn test_remote_relative_names_never_reach_disk() {
    let server = module_server();
    let dir = anchor_dir();
    write_module(dir.path(), "lib/a.js", "exports.local = true;");
    let mut engine = engine_at(dir.path());

    assert!(matches!(
        engine.require(&server.url("/mods/local.js")),
        Err(RequireError::FetchFailure { .. })
    ));
    assert!(server.hits().contains(&"/mods/lib/a.js".to_string()));
}

#[test]
fn test_cross_origin_hop_is_one_way() {
    let origin_a = TestServer::start(Vec::new());
    let origin_b = TestServer::start(vec![(
        "/hop/leaf.js",
        Route::ok("exports.name = 'leaf-b';"),
    )]);
    origin_b.add_route(
        "/hop/entry.js",
        Route::ok(&format!(
            "exports.leaf = require('./leaf.js').name; \
             try {{ require('//{}/back.js'); exports.back = 'loaded'; }} \
             catch (e) {{ exports.back = e.code; }}",
            origin_a.authority()
        )),
    );
    origin_a.add_route("/back.js", Route::ok("exports.back = true;"));
    origin_a.add_route(
        "/entry.js",
        Route::ok(&format!(
            "exports.hop = require('{}');",
            origin_b.url("/hop/entry.js")
        )),
    );

    let dir = anchor_dir();
    let mut engine = engine_at(dir.path());
    let code = format!(
        "const m = require('{}'); m.hop.leaf + ':' + m.hop.back",
        origin_a.url("/entry.js")
    );
    assert_eq!(
        eval_string(&mut engine, &code),
        "leaf-b:ERR_SECURITY_VIOLATION"
    );
    // the scope pinned to B never fetched from A
    assert_eq!(origin_a.hits(), vec!["/entry.js".to_string()]);
    assert_eq!(
        origin_b.hits(),
        vec!["/hop/entry.js".to_string(), "/hop/leaf.js".to_string()]
    );
}

#[test]
fn test_absolute_reference_to_another_origin_repins() {
    let origin_a = module_server();
    let origin_b = TestServer::start(vec![(
        "/b.js",
        Route::ok(&format!(
            "exports.msg = require('{}').msg;",
            origin_a.url("/mods/submod.js")
        )),
    )]);

    let dir = anchor_dir();
    let mut engine = engine_at(dir.path());
    let code = format!("require('{}').msg", origin_b.url("/b.js"));
    assert_eq!(eval_string(&mut engine, &code), "other");
}

const ESCAPE_ATTEMPTS: &str = r#"
function attempt(f) {
    try {
        f();
        return 'reached';
    } catch (e) {
        return 'blocked';
    }
}
exports.stdio = attempt(() => globalThis.require('@stdio'));
exports.secret = attempt(() => globalThis.require('secret.js'));
exports.exec = attempt(() => globalThis.require('@rawexec'));
exports.viaBuiltin = attempt(() =>
    require('@uuid').v4.constructor('return this')().require('@stdio'));
exports.viaArrow = attempt(() => (() => {}).constructor('return this')().require('@stdio'));
globalThis.leaked = true;
"#;

#[test]
fn test_remote_cannot_reach_global_require() {
    let server = TestServer::start(vec![("/escape.js", Route::ok(ESCAPE_ATTEMPTS))]);
    let dir = anchor_dir();
    write_module(dir.path(), "secret.js", "exports.secret = 'hunter2';");
    let mut engine = engine_at(dir.path());
    engine.unrestrict("@rawexec");

    let code = format!(
        "const m = require('{}'); [m.stdio, m.secret, m.exec, m.viaBuiltin, m.viaArrow].join()",
        server.url("/escape.js")
    );
    assert_eq!(
        eval_string(&mut engine, &code),
        "blocked,blocked,blocked,blocked,blocked"
    );
    // only the remote module itself was loaded
    assert_eq!(engine.cached_modules(), 1);
    assert_eq!(eval_string(&mut engine, "typeof leaked"), "undefined");

    // trusted code keeps its own require
    assert_eq!(eval_string(&mut engine, "require('secret.js').secret"), "hunter2");
}

#[test]
fn test_remote_functions_called_from_trusted_code_stay_untrusted() {
    let server = TestServer::start(vec![(
        "/deputy.js",
        Route::ok(
            "exports.later = () => typeof globalThis.require; \
             exports.grab = () => globalThis.require('secret.js');",
        ),
    )]);
    let dir = anchor_dir();
    write_module(dir.path(), "secret.js", "exports.secret = 'hunter2';");
    let mut engine = engine_at(dir.path());

    let code = format!(
        "const m = require('{}'); \
         let grabbed; try {{ m.grab(); grabbed = 'reached'; }} catch (e) {{ grabbed = 'blocked'; }} \
         [m.later(), typeof require, grabbed].join()",
        server.url("/deputy.js")
    );
    assert_eq!(eval_string(&mut engine, &code), "undefined,function,blocked");
    assert_eq!(engine.cached_modules(), 1);
}

#[test]
fn test_not_found_is_fetch_failure() {
    let server = module_server();
    let dir = anchor_dir();
    let mut engine = engine_at(dir.path());

    let err = engine.require(&server.url("/mods/missing.js")).unwrap_err();
    assert!(matches!(err, RequireError::FetchFailure { .. }));
    assert!(err.to_string().contains("404"));

    // failures are not cached
    let err = engine.require(&server.url("/mods/missing.js")).unwrap_err();
    assert!(matches!(err, RequireError::FetchFailure { .. }));
    assert_eq!(engine.cached_modules(), 0);
}

#[test]
fn test_redirects_are_not_followed() {
    let server = module_server();
    let dir = anchor_dir();
    let mut engine = engine_at(dir.path());

    let err = engine.require(&server.url("/mods/moved.js")).unwrap_err();
    assert!(matches!(err, RequireError::FetchFailure { .. }));
    assert!(!server.hits().contains(&"/mods/submod.js".to_string()));
}

#[test]
fn test_fetch_timeout() {
    let server = module_server();
    let dir = anchor_dir();
    let mut engine = engine_at(dir.path());

    let err = engine.require(&server.url("/mods/slow.js")).unwrap_err();
    assert!(matches!(err, RequireError::FetchFailure { .. }));
}

#[test]
fn test_remote_script_error_passes_through() {
    let server = module_server();
    let dir = anchor_dir();
    let mut engine = engine_at(dir.path());

    let code = format!(
        "try {{ require('{}'); 'no' }} catch (e) {{ e.message }}",
        server.url("/mods/throws.js")
    );
    assert_eq!(eval_string(&mut engine, &code), "remote failure");
}

#[test]
fn test_only_http_schemes() {
    let dir = anchor_dir();
    let mut engine = engine_at(dir.path());
    assert!(matches!(
        engine.require("ftp://example.com/mod.js"),
        Err(RequireError::FetchFailure { .. })
    ));
}

struct Shared;

impl Capability for Shared {
    fn populate(&self, exports: &JsObject, context: &mut Context) -> JsResult<()> {
        exports.set(js_string!("shared"), true, true, context)?;
        Ok(())
    }
}

#[test]
fn test_host_remote_builtin() {
    let server = TestServer::start(vec![(
        "/uses-shared.js",
        Route::ok("exports.ok = require('@shared').shared;"),
    )]);
    let dir = anchor_dir();
    let mut engine = engine_at(dir.path());
    engine.add_remote_builtin("@shared", &Shared).unwrap();

    let code = format!("require('{}').ok", server.url("/uses-shared.js"));
    assert_eq!(eval_string(&mut engine, &code), "true");
}
