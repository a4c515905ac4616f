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

//! Cryptographic material loaded once at startup: the trust anchor derived
//! from the client trust store, and the proxy's signing key. Both are kept
//! as PEM bytes because the crypto engine contract is PEM-in on either
//! backend.

use std::fs;
use std::path::Path;

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use x509_cert::der::Encode;
use x509_cert::Certificate;

use crate::config::CmsConfig;
use crate::error::{SignetError, SignetResult};

#[derive(Debug, Clone, Default)]
pub struct CryptoMaterials {
    /// SubjectPublicKeyInfo PEM of the first certificate in the client
    /// trust store. Handed verbatim to whichever crypto backend verifies.
    trust_anchor_pem: Option<Vec<u8>>,
    /// Raw PEM contents of the proxy private key file (PKCS#8 or PKCS#1).
    signing_key_pem: Option<Vec<u8>>,
}

impl CryptoMaterials {
    /// Reads and validates the material named by the `cms` configuration.
    /// Missing paths are tolerated (verification or signing is disabled);
    /// unreadable or unparsable files are startup-fatal.
    pub fn load(cms: &CmsConfig) -> SignetResult<Self> {
        let trust_anchor_pem = if cms.client_trust_store.is_empty() {
            None
        } else {
            Some(trust_anchor_from_store(Path::new(&cms.client_trust_store))?)
        };

        let signing_key_pem = if cms.proxy_private_key.is_empty() {
            None
        } else {
            let path = Path::new(&cms.proxy_private_key);
            let pem = fs::read(path).map_err(|source| SignetError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            validate_private_key_pem(&pem)?;
            Some(pem)
        };

        Ok(Self {
            trust_anchor_pem,
            signing_key_pem,
        })
    }

    /// Assembles materials from already-derived PEM blobs. Used by tests and
    /// by embedders that manage key files themselves.
    pub fn from_parts(trust_anchor_pem: Option<Vec<u8>>, signing_key_pem: Option<Vec<u8>>) -> Self {
        Self {
            trust_anchor_pem,
            signing_key_pem,
        }
    }

    pub fn trust_anchor_pem(&self) -> Option<&[u8]> {
        self.trust_anchor_pem.as_deref()
    }

    pub fn signing_key_pem(&self) -> Option<&[u8]> {
        self.signing_key_pem.as_deref()
    }
}

/// Parses the trust store PEM, takes its first certificate, and re-encodes
/// that certificate's public key as a standalone SubjectPublicKeyInfo PEM.
fn trust_anchor_from_store(path: &Path) -> SignetResult<Vec<u8>> {
    let pem = fs::read(path).map_err(|source| SignetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let certs = Certificate::load_pem_chain(&pem)
        .map_err(|err| SignetError::TrustStore(format!("{}: {err}", path.display())))?;
    let first = certs.into_iter().next().ok_or_else(|| {
        SignetError::TrustStore(format!("{}: no certificates found", path.display()))
    })?;

    let spki_der = first
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|err| SignetError::TrustStore(err.to_string()))?;
    let public_key = RsaPublicKey::from_public_key_der(&spki_der)
        .map_err(|err| SignetError::TrustStore(format!("not an RSA certificate: {err}")))?;
    let spki_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|err| SignetError::TrustStore(err.to_string()))?;

    Ok(spki_pem.into_bytes())
}

fn validate_private_key_pem(pem: &[u8]) -> SignetResult<()> {
    let text = core::str::from_utf8(pem)
        .map_err(|_| SignetError::PrivateKey("key file is not valid UTF-8".to_string()))?;
    RsaPrivateKey::from_pkcs8_pem(text)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(text))
        .map_err(|err| SignetError::PrivateKey(err.to_string()))?;
    Ok(())
}

/// One shared 2048-bit key for the whole test binary; generation is slow
/// enough that per-test keys would dominate the suite's runtime.
#[cfg(test)]
pub(crate) fn test_signing_key() -> RsaPrivateKey {
    use std::sync::OnceLock;

    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("generate test key")
    })
    .clone()
}
