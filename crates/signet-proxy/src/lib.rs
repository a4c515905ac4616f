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

//! signet-proxy
//!
//! The transport side of the signet proxy: a raw-bytes codec that defeats
//! structural decoding on both legs, a stream director that terminates any
//! inbound RPC and mirrors it onto a per-call backend stream, a reflection
//! client that assembles the method registry from a live backend, and the
//! server wiring that mounts the director as a catch-all.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod codec;
pub mod director;
pub mod reflection;
pub mod server;

pub use crate::codec::RawCodec;
pub use crate::director::{ProxyContext, StreamDirector};
