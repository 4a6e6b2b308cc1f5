// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tiered-trust module system
//!
//! `require(specifier)` resolves one of three tiers:
//! - `@name` - builtin capability registered by the host
//! - `path/to/module.js` - trusted file under the anchor root
//! - `https://host/module.js` - untrusted remote module, pinned to its origin
//!
//! Every loaded module is cached per engine, returned as the same frozen
//! exports object on each request, and never cached when loading fails.

mod cache;
pub mod fetch;
mod gate;
mod local;
mod registry;
mod remote;
pub mod sandbox;
pub mod specifier;
mod storage;
mod trust;

pub use cache::{ModuleCache, ModuleKey, ModuleRecord};
pub use fetch::{Fetcher, HttpFetcher};
pub use gate::{Realms, Scope, TrustGate};
pub use local::LocalScope;
pub use registry::{Capability, CapabilityDescriptor, CapabilityFlags, CapabilityRegistry};
pub use remote::RemoteScope;
pub use specifier::Specifier;
pub use storage::{ReadOnlyStorage, StorageError};
pub use trust::TrustState;
