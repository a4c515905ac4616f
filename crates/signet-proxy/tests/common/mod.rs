// Copyright (c) 2026 Signet Maintainers and Signet Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures: an in-process echo backend, an in-process proxy, and
//! cached RSA material (key generation is too slow to repeat per test).

#![allow(dead_code)]

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex, OnceLock};

use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tokio_stream::Stream;
use tonic::transport::Server;
use tonic::{Request, Response, Status, Streaming};

use signet_core::route::EnvelopeMap;
use signet_core::{CryptoEngine, CryptoMaterials, MethodRegistry, RouteMode, RouteRule, RouteTable};
use signet_echo::pb::echo_service_server::{EchoService, EchoServiceServer};
use signet_echo::pb::secure_service_server::{SecureService, SecureServiceServer};
use signet_echo::pb::{EchoRequest, EchoResponse, SecureEnvelope};
use signet_proxy::director::ProxyContext;

pub fn proxy_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("proxy key"))
}

pub fn client_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("client key"))
}

pub fn proxy_key_pem() -> Vec<u8> {
    proxy_key()
        .to_pkcs8_pem(LineEnding::LF)
        .expect("encode proxy key")
        .to_string()
        .into_bytes()
}

pub fn client_anchor_pem() -> Vec<u8> {
    client_key()
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .expect("encode client anchor")
        .into_bytes()
}

/// What the proxy is expected to write into `proxy_signature`.
pub fn expected_proxy_signature(payload: &[u8]) -> Vec<u8> {
    CryptoEngine::Native
        .sign(payload, &proxy_key_pem())
        .expect("sign fixture payload")
}

pub fn client_signature(payload: &[u8]) -> Vec<u8> {
    let pem = client_key()
        .to_pkcs8_pem(LineEnding::LF)
        .expect("encode client key")
        .to_string()
        .into_bytes();
    CryptoEngine::Native
        .sign(payload, &pem)
        .expect("sign with client key")
}

pub fn echo_registry() -> MethodRegistry {
    MethodRegistry::from_descriptor_set_bytes(signet_echo::FILE_DESCRIPTOR_SET)
        .expect("echo descriptor set")
}

pub fn secure_envelope_map() -> EnvelopeMap {
    EnvelopeMap {
        payload_field: "payload".to_string(),
        type_url_field: "type_url".to_string(),
        client_sig_field: "client_signature".to_string(),
        proxy_sig_field: "proxy_signature".to_string(),
        metadata_field: "metadata".to_string(),
    }
}

pub fn route(pattern: &str, mode: RouteMode) -> RouteRule {
    RouteRule {
        pattern: pattern.to_string(),
        mode,
        envelope: secure_envelope_map(),
    }
}

pub struct EchoBackend;

#[tonic::async_trait]
impl EchoService for EchoBackend {
    async fn unary_echo(
        &self,
        request: Request<EchoRequest>,
    ) -> Result<Response<EchoResponse>, Status> {
        let message = request.into_inner().message;
        Ok(Response::new(EchoResponse {
            message: format!("Backend says: {message}"),
        }))
    }

    type BidiEchoStream = Pin<Box<dyn Stream<Item = Result<EchoResponse, Status>> + Send>>;

    async fn bidi_echo(
        &self,
        request: Request<Streaming<EchoRequest>>,
    ) -> Result<Response<Self::BidiEchoStream>, Status> {
        let mut inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            while let Ok(Some(message)) = inbound.message().await {
                let reply = EchoResponse {
                    message: format!("Backend says: {}", message.message),
                };
                if tx.send(Ok(reply)).await.is_err() {
                    break;
                }
            }
        });
        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }
}

/// Records every envelope the backend receives so tests can assert on what
/// actually crossed the proxy.
#[derive(Clone, Default)]
pub struct SecureBackend {
    pub received: Arc<Mutex<Vec<SecureEnvelope>>>,
}

impl SecureBackend {
    fn record(&self, envelope: &SecureEnvelope) {
        self.received
            .lock()
            .expect("received lock")
            .push(envelope.clone());
    }

    pub fn snapshot(&self) -> Vec<SecureEnvelope> {
        self.received.lock().expect("received lock").clone()
    }
}

#[tonic::async_trait]
impl SecureService for SecureBackend {
    async fn inspect_outer(
        &self,
        request: Request<SecureEnvelope>,
    ) -> Result<Response<SecureEnvelope>, Status> {
        let envelope = request.into_inner();
        self.record(&envelope);
        Ok(Response::new(envelope))
    }

    async fn secure_echo(
        &self,
        request: Request<SecureEnvelope>,
    ) -> Result<Response<SecureEnvelope>, Status> {
        let envelope = request.into_inner();
        self.record(&envelope);
        Ok(Response::new(envelope))
    }

    type SecureStreamStream = Pin<Box<dyn Stream<Item = Result<SecureEnvelope, Status>> + Send>>;

    async fn secure_stream(
        &self,
        request: Request<Streaming<SecureEnvelope>>,
    ) -> Result<Response<Self::SecureStreamStream>, Status> {
        let mut inbound = request.into_inner();
        let recorder = self.clone();
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            while let Ok(Some(envelope)) = inbound.message().await {
                recorder.record(&envelope);
                if tx.send(Ok(envelope)).await.is_err() {
                    break;
                }
            }
        });
        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }
}

pub async fn start_backend(secure: SecureBackend, with_reflection: bool) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind backend");
    let addr = listener.local_addr().expect("backend addr");
    let incoming = TcpListenerStream::new(listener);
    tokio::spawn(async move {
        let mut router = Server::builder()
            .add_service(EchoServiceServer::new(EchoBackend))
            .add_service(SecureServiceServer::new(secure));
        if with_reflection {
            let reflection = tonic_reflection::server::Builder::configure()
                .register_encoded_file_descriptor_set(signet_echo::FILE_DESCRIPTOR_SET)
                .build_v1()
                .expect("reflection service");
            router = router.add_service(reflection);
        }
        router
            .serve_with_incoming(incoming)
            .await
            .expect("backend server");
    });
    addr
}

pub async fn start_proxy(
    backend_addr: SocketAddr,
    routes: Vec<RouteRule>,
    materials: CryptoMaterials,
    engine: CryptoEngine,
    registry: MethodRegistry,
) -> SocketAddr {
    let ctx = Arc::new(ProxyContext::from_parts(
        backend_addr.to_string(),
        RouteTable::new(routes),
        registry,
        materials,
        engine,
    ));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind proxy");
    let addr = listener.local_addr().expect("proxy addr");
    tokio::spawn(async move {
        signet_proxy::server::serve(listener, ctx, std::future::pending())
            .await
            .expect("proxy server");
    });
    addr
}
