// Copyright [2026] [Signet Maintainers]
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// Copyright (c) 2026 Signet Maintainers and Signet Contributors
// SPDX-License-Identifier: Apache-2.0

//! signet-core
//!
//! The message-aware heart of the signet gRPC proxy:
//! - YAML configuration model (listen/backend addresses, schema source, routes, CMS material)
//! - First-match route table with `/*` prefix patterns
//! - Immutable method-descriptor registry with a by-suffix message lookup
//! - Dynamic envelope processor: decode any frame against runtime descriptors,
//!   verify a client signature, inject a proxy signature, re-encode
//! - RSA-SHA256 PKCS#1 v1.5 crypto engine with a native backend and a
//!   foreign-ABI backend (see `signet-ffi`)
//!
//! Everything in this crate is constructed once at startup and read-only for
//! the life of the process; all types are safe to share across RPC tasks.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod registry;
pub mod route;

#[cfg(test)]
pub(crate) mod testutil;

pub use crate::config::Config;
pub use crate::crypto::CryptoEngine;
pub use crate::envelope::{Direction, EnvelopeProcessor};
pub use crate::error::{SignetError, SignetResult};
pub use crate::keys::CryptoMaterials;
pub use crate::registry::MethodRegistry;
pub use crate::route::{RouteMode, RouteRule, RouteTable};
