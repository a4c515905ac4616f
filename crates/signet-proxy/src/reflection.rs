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

//! Pull-model registry construction: interrogate the backend over gRPC
//! Server Reflection, resolve every advertised service, and assemble the
//! same immutable registry the descriptor-set path produces.

use std::collections::{HashMap, HashSet};

use prost::Message as _;
use prost_reflect::DescriptorPool;
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Endpoint;
use tonic_reflection::pb::v1::server_reflection_client::ServerReflectionClient;
use tonic_reflection::pb::v1::server_reflection_request::MessageRequest;
use tonic_reflection::pb::v1::server_reflection_response::MessageResponse;
use tonic_reflection::pb::v1::ServerReflectionRequest;

use signet_core::MethodRegistry;

/// Reflection service names excluded when listing, matching the convention
/// that the schema source does not describe itself.
const REFLECTION_SERVICES: [&str; 2] = [
    "grpc.reflection.v1.ServerReflection",
    "grpc.reflection.v1alpha.ServerReflection",
];

#[derive(Debug, thiserror::Error)]
pub enum ReflectionError {
    #[error("reflection dial failed: {0}")]
    Dial(#[from] tonic::transport::Error),

    #[error("reflection rpc failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("reflection protocol error: {0}")]
    Protocol(String),

    #[error("failed to decode file descriptor: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("failed to assemble descriptor pool: {0}")]
    Descriptor(#[from] prost_reflect::DescriptorError),
}

/// Dials `addr`, lists services, resolves each one's file descriptors, and
/// indexes every method. One reflection stream serves the whole exchange.
pub async fn load_backend_registry(addr: &str) -> Result<MethodRegistry, ReflectionError> {
    let uri = if addr.contains("://") {
        addr.to_string()
    } else {
        format!("http://{addr}")
    };
    let channel = Endpoint::from_shared(uri)
        .map_err(|err| ReflectionError::Protocol(format!("invalid backend address: {err}")))?
        .connect()
        .await?;
    let mut client = ServerReflectionClient::new(channel);

    let (tx, rx) = mpsc::channel::<ServerReflectionRequest>(8);
    let mut responses = client
        .server_reflection_info(ReceiverStream::new(rx))
        .await?
        .into_inner();

    let send = |message_request| ServerReflectionRequest {
        host: String::new(),
        message_request: Some(message_request),
    };

    tx.send(send(MessageRequest::ListServices(String::new())))
        .await
        .map_err(|_| ReflectionError::Protocol("reflection stream closed early".to_string()))?;
    let services = match next_response(&mut responses).await? {
        MessageResponse::ListServicesResponse(list) => list.service,
        other => {
            return Err(ReflectionError::Protocol(format!(
                "expected ListServicesResponse, got {other:?}"
            )))
        }
    };

    let mut files: Vec<FileDescriptorProto> = Vec::new();
    let mut seen_files = HashSet::new();
    for service in services {
        if REFLECTION_SERVICES.contains(&service.name.as_str()) {
            continue;
        }
        tx.send(send(MessageRequest::FileContainingSymbol(
            service.name.clone(),
        )))
        .await
        .map_err(|_| ReflectionError::Protocol("reflection stream closed early".to_string()))?;

        match next_response(&mut responses).await? {
            MessageResponse::FileDescriptorResponse(descriptors) => {
                for encoded in descriptors.file_descriptor_proto {
                    let file = FileDescriptorProto::decode(&encoded[..])?;
                    if seen_files.insert(file.name().to_string()) {
                        files.push(file);
                    }
                }
            }
            MessageResponse::ErrorResponse(err) => {
                tracing::warn!(
                    service = %service.name,
                    code = err.error_code,
                    message = %err.error_message,
                    "backend could not resolve service; skipping"
                );
            }
            other => {
                return Err(ReflectionError::Protocol(format!(
                    "expected FileDescriptorResponse, got {other:?}"
                )))
            }
        }
    }
    drop(tx);

    let ordered = topological_order(files);
    let pool = DescriptorPool::from_file_descriptor_set(FileDescriptorSet { file: ordered })?;
    Ok(MethodRegistry::from_pool(&pool))
}

async fn next_response(
    responses: &mut tonic::Streaming<tonic_reflection::pb::v1::ServerReflectionResponse>,
) -> Result<MessageResponse, ReflectionError> {
    let response = responses
        .message()
        .await?
        .ok_or_else(|| ReflectionError::Protocol("reflection stream ended early".to_string()))?;
    response
        .message_response
        .ok_or_else(|| ReflectionError::Protocol("empty reflection response".to_string()))
}

/// Orders files so every import precedes its importer; the pool insists on
/// resolvable dependencies. Unknown imports (well-known types the backend
/// chose not to send) are left to the pool to reject.
fn topological_order(files: Vec<FileDescriptorProto>) -> Vec<FileDescriptorProto> {
    let mut by_name: HashMap<String, FileDescriptorProto> = files
        .into_iter()
        .map(|file| (file.name().to_string(), file))
        .collect();
    let names: Vec<String> = by_name.keys().cloned().collect();

    let mut ordered = Vec::with_capacity(by_name.len());
    let mut emitted = HashSet::new();
    for name in names {
        emit(&name, &mut by_name, &mut emitted, &mut ordered);
    }
    ordered
}

fn emit(
    name: &str,
    by_name: &mut HashMap<String, FileDescriptorProto>,
    emitted: &mut HashSet<String>,
    ordered: &mut Vec<FileDescriptorProto>,
) {
    if !emitted.insert(name.to_string()) {
        return;
    }
    let Some(file) = by_name.remove(name) else {
        return;
    };
    for dependency in &file.dependency {
        emit(dependency, by_name, emitted, ordered);
    }
    ordered.push(file);
}
