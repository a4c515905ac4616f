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

//! Per-frame envelope processing against descriptors resolved at runtime.
//!
//! The processor never fails a stream: every decode, field-access, crypto,
//! or re-encode problem is logged and answered by forwarding the original
//! frame byte-for-byte.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use prost::Message as _;
use prost_reflect::{DynamicMessage, Kind, MapKey, ReflectMessage, Value};
use sha2::{Digest, Sha256};

use crate::crypto::CryptoEngine;
use crate::keys::CryptoMaterials;
use crate::registry::MethodRegistry;
use crate::route::{RouteMode, RouteRule};

/// Which way the frame is travelling through the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Response => "response",
        }
    }
}

/// Why a typed field write was rejected.
#[derive(Debug, PartialEq, Eq)]
enum FieldWrite {
    Missing,
    TypeMismatch,
}

pub struct EnvelopeProcessor {
    registry: Arc<MethodRegistry>,
    materials: Arc<CryptoMaterials>,
    engine: CryptoEngine,
}

impl EnvelopeProcessor {
    pub fn new(
        registry: Arc<MethodRegistry>,
        materials: Arc<CryptoMaterials>,
        engine: CryptoEngine,
    ) -> Self {
        Self {
            registry,
            materials,
            engine,
        }
    }

    pub fn engine(&self) -> CryptoEngine {
        self.engine
    }

    /// Applies the route's envelope semantics to one frame and returns the
    /// bytes to forward. The result is either a fresh serialization of the
    /// mutated message or, on any failure (and always for `inspect-outer`),
    /// the input bytes unchanged.
    pub fn process(
        &self,
        method: &str,
        direction: Direction,
        frame: Bytes,
        route: &RouteRule,
    ) -> Bytes {
        let dir = direction.as_str();

        let Some(entry) = self.registry.method(method) else {
            tracing::warn!(%method, dir, "no descriptor loaded for method; forwarding unchanged");
            return frame;
        };
        let descriptor = match direction {
            Direction::Request => entry.input(),
            Direction::Response => entry.output(),
        };

        let mut message = match DynamicMessage::decode(descriptor, frame.clone()) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(%method, dir, error = %err, "failed to decode frame; forwarding unchanged");
                return frame;
            }
        };

        // Best-effort envelope rendering for the diagnostic stream.
        if let Ok(rendered) = serde_json::to_string(&message) {
            tracing::info!(%method, dir, envelope = %rendered, "decoded envelope");
        }

        let payload = bytes_field(&message, &route.envelope.payload_field);
        let type_url = string_field(&message, &route.envelope.type_url_field);
        let metadata = map_field(&message, &route.envelope.metadata_field);
        if !metadata.is_empty() {
            tracing::debug!(%method, dir, ?metadata, "envelope metadata");
        }

        if !payload.is_empty() && !type_url.is_empty() {
            self.inspect_inner_payload(method, dir, &payload, &type_url);
        }

        if route.mode != RouteMode::InspectVerifySign {
            // inspect-outer mutates nothing; skip re-serialization so the
            // forwarded bytes stay bit-identical to what was received.
            return frame;
        }

        let client_sig = bytes_field(&message, &route.envelope.client_sig_field);
        match (client_sig.is_empty(), self.materials.trust_anchor_pem()) {
            (false, Some(anchor)) => {
                let payload_sha256 = hex::encode(Sha256::digest(&payload));
                if self.engine.verify(&payload, &client_sig, anchor) {
                    tracing::info!(
                        %method, dir,
                        sig_len = client_sig.len(),
                        payload_sha256 = %payload_sha256,
                        "client signature verified"
                    );
                } else {
                    tracing::warn!(
                        %method, dir,
                        client_sig_sha256 = %hex::encode(Sha256::digest(&client_sig)),
                        payload_sha256 = %payload_sha256,
                        "client signature verification failed"
                    );
                }
            }
            _ => {
                tracing::info!(%method, dir, "no client signature or trust store configured");
            }
        }

        let proxy_sig = match self.materials.signing_key_pem() {
            Some(key_pem) => match self.engine.sign(&payload, key_pem) {
                Some(signature) => Bytes::from(signature),
                None => {
                    tracing::warn!(%method, dir, "failed to sign payload; forwarding unchanged");
                    return frame;
                }
            },
            None => {
                // Diagnostic mock so end-to-end flows stay observable on
                // keyless deployments.
                tracing::warn!(%method, dir, "no proxy private key loaded; emitting mock signature");
                let mut mock = b"proxy_signed_".to_vec();
                mock.extend_from_slice(&payload);
                Bytes::from(mock)
            }
        };

        if let Err(reason) = set_bytes_field(&mut message, &route.envelope.proxy_sig_field, proxy_sig)
        {
            tracing::warn!(
                %method, dir,
                field = %route.envelope.proxy_sig_field,
                ?reason,
                "could not set proxy signature field; forwarding unchanged"
            );
            return frame;
        }

        Bytes::from(message.encode_to_vec())
    }

    /// Nested decode of the inner payload named by the type URL, for
    /// inspection logging only. Every failure here is silently ignored.
    fn inspect_inner_payload(&self, method: &str, dir: &str, payload: &Bytes, type_url: &str) {
        let suffix = type_url.rsplit('/').next().unwrap_or("");
        let Some(inner_descriptor) = self.registry.message_by_suffix(suffix) else {
            return;
        };
        let Ok(inner) = DynamicMessage::decode(inner_descriptor, payload.clone()) else {
            return;
        };
        if let Ok(rendered) = serde_json::to_string(&inner) {
            tracing::info!(%method, dir, %type_url, inner = %rendered, "decoded inner payload");
        }
    }
}

/// Reads a bytes-typed field; absence, unmapped name, or type mismatch all
/// read as empty.
fn bytes_field(message: &DynamicMessage, name: &str) -> Bytes {
    if name.is_empty() {
        return Bytes::new();
    }
    match message.get_field_by_name(name) {
        Some(value) => match value.as_ref() {
            Value::Bytes(bytes) => bytes.clone(),
            _ => Bytes::new(),
        },
        None => Bytes::new(),
    }
}

/// Reads a string-typed field with the same typed-zero fallback.
fn string_field(message: &DynamicMessage, name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    match message.get_field_by_name(name) {
        Some(value) => match value.as_ref() {
            Value::String(text) => text.clone(),
            _ => String::new(),
        },
        None => String::new(),
    }
}

/// Reads a string→string map field; non-string entries are skipped.
fn map_field(message: &DynamicMessage, name: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if name.is_empty() {
        return out;
    }
    if let Some(value) = message.get_field_by_name(name) {
        if let Value::Map(entries) = value.as_ref() {
            for (key, value) in entries {
                if let (MapKey::String(key), Value::String(value)) = (key, value) {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
    }
    out
}

/// Writes a bytes-typed field, distinguishing an absent field from a
/// type-mismatched one.
fn set_bytes_field(
    message: &mut DynamicMessage,
    name: &str,
    value: Bytes,
) -> Result<(), FieldWrite> {
    if name.is_empty() {
        return Err(FieldWrite::Missing);
    }
    let field = message
        .descriptor()
        .get_field_by_name(name)
        .ok_or(FieldWrite::Missing)?;
    if field.is_list() || field.is_map() || !matches!(field.kind(), Kind::Bytes) {
        return Err(FieldWrite::TypeMismatch);
    }
    message
        .try_set_field_by_name(name, Value::Bytes(value))
        .map_err(|_| FieldWrite::TypeMismatch)
}
