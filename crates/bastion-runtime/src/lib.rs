// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # bastion-runtime
//!
//! An embeddable JavaScript engine whose `require` enforces tiered trust.
//!
//! - **Builtins** (`@name`) are native capabilities registered by the host.
//!   Sensitive ones stay restricted until the host lifts the restriction.
//! - **Local modules** (`lib/util.js`) are trusted files below an anchor
//!   directory. Nothing outside that directory can be loaded.
//! - **Remote modules** (`https://host/mod.js`) are untrusted. Each chain of
//!   remote requires is pinned to one origin and may only use builtins marked
//!   remote-safe.
//!
//! Every module body runs strict, with a frozen `require`, and its exports
//! are frozen before any other code sees them. The standard intrinsics are
//! frozen when the engine is built.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bastion_runtime::{Engine, EngineConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut engine = Engine::with_config(EngineConfig::default().with_anchor("./scripts"))?;
//!     engine.connect_stdio(std::io::stdin(), std::io::stdout(), std::io::stderr());
//!     engine.unrestrict("@rawexec");
//!     engine.eval(r#"require("main.js")"#)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Custom capabilities
//!
//! ```rust,ignore
//! use bastion_runtime::{Capability, Engine};
//! use boa_engine::{js_string, Context, JsObject, JsResult};
//!
//! struct Answer;
//!
//! impl Capability for Answer {
//!     fn populate(&self, exports: &JsObject, context: &mut Context) -> JsResult<()> {
//!         exports.set(js_string!("value"), 42, true, context)?;
//!         Ok(())
//!     }
//! }
//!
//! let mut engine = Engine::new()?;
//! engine.add_remote_builtin("@answer", &Answer)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod error;
pub mod globals;
pub mod module_system;
pub mod modules;

// Re-exports
pub use boa_engine;
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, RequireError, Result};
pub use globals::stdio::SharedBuffer;
pub use module_system::{Capability, CapabilityFlags};

/// Version of the bastion runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
