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

//! Server wiring: every request path falls through to the stream director,
//! served over cleartext HTTP/2 so gRPC clients connect with prior
//! knowledge.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::director::{ProxyContext, StreamDirector};

/// Serves the proxy on an already-bound listener until `shutdown` resolves.
/// Binding is left to the caller so startup failures surface before any
/// task is spawned and tests can bind port zero.
pub async fn serve(
    listener: TcpListener,
    ctx: Arc<ProxyContext>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = axum::Router::new().fallback_service(StreamDirector::new(ctx));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
