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

//! The stream director: terminates any inbound RPC, dials the backend per
//! call, opens a mirror stream with both directions declared streaming (so
//! one handler covers all four RPC shapes), and runs two pumps that forward
//! frames in receive order, applying the envelope processor when the
//! matched route asks for it.
//!
//! Per-frame processing failures never terminate a stream; transport
//! failures on either leg cancel the per-RPC scope and surface as the RPC
//! status.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::uri::PathAndQuery;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tonic::metadata::{KeyAndValueRef, MetadataMap};
use tonic::transport::Endpoint;
use tonic::{Extensions, Request, Response, Status, Streaming};
use tower::Service;

use signet_core::envelope::Direction;
use signet_core::{
    Config, CryptoEngine, CryptoMaterials, EnvelopeProcessor, MethodRegistry, RouteMode, RouteRule,
    RouteTable,
};

use crate::codec::RawCodec;

/// Read-only state shared by every RPC: the route table, the envelope
/// processor (registry + crypto), and the backend address.
pub struct ProxyContext {
    backend_addr: String,
    routes: RouteTable,
    processor: EnvelopeProcessor,
}

impl ProxyContext {
    pub fn new(
        config: &Config,
        registry: MethodRegistry,
        materials: CryptoMaterials,
        engine: CryptoEngine,
    ) -> Self {
        Self::from_parts(
            config.backend.address.clone(),
            RouteTable::new(config.routes.clone()),
            registry,
            materials,
            engine,
        )
    }

    pub fn from_parts(
        backend_addr: String,
        routes: RouteTable,
        registry: MethodRegistry,
        materials: CryptoMaterials,
        engine: CryptoEngine,
    ) -> Self {
        let processor = EnvelopeProcessor::new(Arc::new(registry), Arc::new(materials), engine);
        Self {
            backend_addr,
            routes,
            processor,
        }
    }

    pub fn engine(&self) -> CryptoEngine {
        self.processor.engine()
    }
}

/// Catch-all tower service. Mounted as the router fallback so every request
/// path reaches it, which is what stands in for an unknown-service handler.
#[derive(Clone)]
pub struct StreamDirector {
    ctx: Arc<ProxyContext>,
}

impl StreamDirector {
    pub fn new(ctx: Arc<ProxyContext>) -> Self {
        Self { ctx }
    }
}

impl Service<http::Request<axum::body::Body>> for StreamDirector {
    type Response = http::Response<axum::body::Body>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<axum::body::Body>) -> Self::Future {
        let ctx = self.ctx.clone();
        Box::pin(async move {
            let method = req.uri().path().to_owned();
            let route = ctx.routes.matched(&method);
            tracing::info!(%method, mode = %route.mode, "intercepted rpc");

            let mut grpc = tonic::server::Grpc::new(RawCodec);
            let relay = RelayCall { ctx, method, route };
            let response = grpc.streaming(relay, req).await;
            Ok(response.map(axum::body::Body::new))
        })
    }
}

/// One accepted RPC being mirrored onto the backend.
struct RelayCall {
    ctx: Arc<ProxyContext>,
    method: String,
    route: RouteRule,
}

impl tonic::server::StreamingService<Bytes> for RelayCall {
    type Response = Bytes;
    type ResponseStream = Pin<Box<dyn Stream<Item = Result<Bytes, Status>> + Send>>;
    type Future =
        Pin<Box<dyn Future<Output = Result<Response<Self::ResponseStream>, Status>> + Send>>;

    fn call(&mut self, request: Request<Streaming<Bytes>>) -> Self::Future {
        let ctx = self.ctx.clone();
        let method = std::mem::take(&mut self.method);
        let route = self.route.clone();
        Box::pin(relay(ctx, method, route, request))
    }
}

async fn relay(
    ctx: Arc<ProxyContext>,
    method: String,
    route: RouteRule,
    request: Request<Streaming<Bytes>>,
) -> Result<Response<Pin<Box<dyn Stream<Item = Result<Bytes, Status>> + Send>>>, Status> {
    let path = PathAndQuery::try_from(method.as_str())
        .map_err(|_| Status::internal("inbound method id unavailable"))?;
    if method.strip_prefix('/').map_or(0, |rest| rest.split('/').count()) != 2 {
        return Err(Status::internal("inbound method id unavailable"));
    }

    let (inbound_metadata, _, inbound) = request.into_parts();

    // Per-call dial, raw codec on this leg too so relayed bytes are never
    // re-encoded. Pooling is a production concern, not a correctness one.
    let endpoint = Endpoint::from_shared(backend_uri(&ctx.backend_addr))
        .map_err(|err| Status::internal(format!("invalid backend address: {err}")))?;
    let channel = endpoint
        .connect()
        .await
        .map_err(|err| Status::unavailable(format!("backend dial failed: {err}")))?;
    let mut client = tonic::client::Grpc::new(channel);
    client
        .ready()
        .await
        .map_err(|err| Status::unavailable(format!("backend not ready: {err}")))?;

    let cancel = CancellationToken::new();
    let (request_tx, request_rx) = mpsc::channel::<Bytes>(16);
    let (response_tx, response_rx) = mpsc::channel::<Result<Bytes, Status>>(16);

    // Mirror inbound metadata onto the outbound stream exactly once.
    let mut outbound = Request::new(ReceiverStream::new(request_rx));
    *outbound.metadata_mut() = mirror_metadata(&inbound_metadata);

    // The client-to-server pump starts before the backend stream resolves:
    // backends that wait for the first frame before replying with headers
    // would otherwise deadlock a client-streaming call.
    tokio::spawn(client_to_server(
        ctx.clone(),
        method.clone(),
        route.clone(),
        inbound,
        request_tx,
        response_tx.clone(),
        cancel.clone(),
    ));

    let backend_response = match client.streaming(outbound, path, RawCodec).await {
        Ok(response) => response,
        Err(status) => {
            cancel.cancel();
            tracing::warn!(method = %method, error = %status, "backend stream open failed");
            return Err(status);
        }
    };
    let (backend_metadata, backend_stream, _) = backend_response.into_parts();

    tokio::spawn(server_to_client(
        ctx,
        method,
        route,
        backend_stream,
        response_tx,
        cancel,
    ));

    let body: Pin<Box<dyn Stream<Item = Result<Bytes, Status>> + Send>> =
        Box::pin(ReceiverStream::new(response_rx));
    Ok(Response::from_parts(
        mirror_metadata(&backend_metadata),
        body,
        Extensions::default(),
    ))
}

/// Pulls frames from the inbound client stream and pushes them toward the
/// backend. A clean end-of-stream drops the sender, which half-closes the
/// backend stream after every queued frame has been flushed.
async fn client_to_server(
    ctx: Arc<ProxyContext>,
    method: String,
    route: RouteRule,
    mut inbound: Streaming<Bytes>,
    request_tx: mpsc::Sender<Bytes>,
    response_tx: mpsc::Sender<Result<Bytes, Status>>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => break,
            next = inbound.message() => next,
        };
        match next {
            Ok(Some(frame)) => {
                let frame = if route.mode == RouteMode::PassThru {
                    frame
                } else {
                    ctx.processor
                        .process(&method, Direction::Request, frame, &route)
                };
                if request_tx.send(frame).await.is_err() {
                    // Backend side is gone; its terminal status reaches the
                    // client through the other pump.
                    break;
                }
            }
            Ok(None) => {
                tracing::debug!(method = %method, "client half-closed");
                break;
            }
            Err(status) => {
                tracing::debug!(method = %method, error = %status, "inbound receive failed");
                let _ = response_tx.try_send(Err(status));
                cancel.cancel();
                break;
            }
        }
    }
}

/// Pulls frames from the backend stream and pushes them toward the client.
/// Owns RPC termination: a clean backend end closes the response stream
/// (OK trailers), a backend error is forwarded as the RPC status, and
/// either way the shared scope is cancelled on exit.
async fn server_to_client(
    ctx: Arc<ProxyContext>,
    method: String,
    route: RouteRule,
    mut backend: Streaming<Bytes>,
    response_tx: mpsc::Sender<Result<Bytes, Status>>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => break,
            next = backend.message() => next,
        };
        match next {
            Ok(Some(frame)) => {
                let frame = if route.mode == RouteMode::PassThru {
                    frame
                } else {
                    ctx.processor
                        .process(&method, Direction::Response, frame, &route)
                };
                if response_tx.send(Ok(frame)).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                tracing::debug!(method = %method, "backend stream drained");
                break;
            }
            Err(status) => {
                tracing::debug!(method = %method, error = %status, "backend receive failed");
                let _ = response_tx.send(Err(status)).await;
                break;
            }
        }
    }
    cancel.cancel();
}

fn backend_uri(addr: &str) -> String {
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("http://{addr}")
    }
}

/// Copies caller metadata for the other leg, dropping the transport-owned
/// headers tonic manages itself on each hop.
fn mirror_metadata(metadata: &MetadataMap) -> MetadataMap {
    const TRANSPORT_OWNED: [&str; 4] = ["content-type", "te", "grpc-encoding", "grpc-accept-encoding"];

    let mut mirrored = MetadataMap::new();
    for entry in metadata.iter() {
        match entry {
            KeyAndValueRef::Ascii(key, value) => {
                if TRANSPORT_OWNED.contains(&key.as_str()) {
                    continue;
                }
                mirrored.append(key.clone(), value.clone());
            }
            KeyAndValueRef::Binary(key, value) => {
                mirrored.append_bin(key.clone(), value.clone());
            }
        }
    }
    mirrored
}

#[cfg(test)]
mod tests {
    use tonic::metadata::MetadataValue;

    use super::*;

    #[test]
    fn mirror_copies_caller_headers_and_drops_transport_ones() {
        let mut metadata = MetadataMap::new();
        metadata.insert("x-request-id", MetadataValue::from_static("abc-123"));
        metadata.insert("content-type", MetadataValue::from_static("application/grpc"));
        metadata.insert("te", MetadataValue::from_static("trailers"));
        metadata.insert("grpc-accept-encoding", MetadataValue::from_static("gzip"));

        let mirrored = mirror_metadata(&metadata);
        assert_eq!(
            mirrored.get("x-request-id").map(|v| v.to_str().unwrap()),
            Some("abc-123")
        );
        assert!(mirrored.get("content-type").is_none());
        assert!(mirrored.get("te").is_none());
        assert!(mirrored.get("grpc-accept-encoding").is_none());
    }

    #[test]
    fn backend_uri_prefixes_bare_authorities() {
        assert_eq!(backend_uri("127.0.0.1:9090"), "http://127.0.0.1:9090");
        assert_eq!(backend_uri("http://host:1"), "http://host:1");
    }
}
