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

//! RSA-SHA256 PKCS#1 v1.5 verify and sign, selectable between two
//! interchangeable backends fixed at startup.
//!
//! Both backends speak the same PEM-in/bytes-out contract: `verify` takes a
//! SubjectPublicKeyInfo PEM, `sign` takes a PKCS#8 or PKCS#1 private key PEM.
//! PKCS#1 v1.5 padding is deterministic, so the two backends must produce
//! bit-identical signatures for equal inputs.

use core::fmt;

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

/// Which backend performs the RSA operations. Process-wide, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoEngine {
    /// In-process implementation on the `rsa` crate.
    Native,
    /// Delegation through the flat byte-in/byte-out ABI in `signet-ffi`.
    Foreign,
}

impl fmt::Display for CryptoEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoEngine::Native => f.write_str("native"),
            CryptoEngine::Foreign => f.write_str("foreign"),
        }
    }
}

impl CryptoEngine {
    /// Verifies `signature` over `payload` against a SubjectPublicKeyInfo
    /// PEM. Zero-length inputs short-circuit to `false` without touching
    /// either backend.
    pub fn verify(&self, payload: &[u8], signature: &[u8], public_key_pem: &[u8]) -> bool {
        if payload.is_empty() || signature.is_empty() || public_key_pem.is_empty() {
            return false;
        }
        match self {
            CryptoEngine::Native => native_verify(payload, signature, public_key_pem),
            CryptoEngine::Foreign => signet_ffi::verify_via_abi(payload, signature, public_key_pem),
        }
    }

    /// Signs `payload` with a PKCS#8 or PKCS#1 private-key PEM. Returns
    /// `None` on zero-length inputs or any key/signing failure.
    pub fn sign(&self, payload: &[u8], private_key_pem: &[u8]) -> Option<Vec<u8>> {
        if payload.is_empty() || private_key_pem.is_empty() {
            return None;
        }
        match self {
            CryptoEngine::Native => native_sign(payload, private_key_pem),
            CryptoEngine::Foreign => signet_ffi::sign_via_abi(payload, private_key_pem),
        }
    }
}

fn native_verify(payload: &[u8], signature: &[u8], public_key_pem: &[u8]) -> bool {
    let Ok(pem) = core::str::from_utf8(public_key_pem) else {
        return false;
    };
    let Ok(public_key) = RsaPublicKey::from_public_key_pem(pem) else {
        return false;
    };

    let digest = Sha256::digest(payload);
    public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
        .is_ok()
}

fn native_sign(payload: &[u8], private_key_pem: &[u8]) -> Option<Vec<u8>> {
    let pem = core::str::from_utf8(private_key_pem).ok()?;
    let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .ok()?;

    let digest = Sha256::digest(payload);
    private_key
        .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .ok()
}

#[cfg(test)]
mod tests {
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};

    use super::*;
    use crate::keys::test_signing_key;

    fn key_pems() -> (Vec<u8>, Vec<u8>) {
        let key = test_signing_key();
        let private_pem = key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
        let public_pem = key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        (private_pem.into_bytes(), public_pem.into_bytes())
    }

    #[test]
    fn sign_then_verify_round_trips_on_both_backends() {
        let (private_pem, public_pem) = key_pems();
        for engine in [CryptoEngine::Native, CryptoEngine::Foreign] {
            let signature = engine.sign(b"abc", &private_pem).unwrap();
            assert!(engine.verify(b"abc", &signature, &public_pem), "{engine}");
            assert!(!engine.verify(b"abd", &signature, &public_pem), "{engine}");
        }
    }

    #[test]
    fn backends_produce_bit_identical_signatures() {
        let (private_pem, _) = key_pems();
        let native = CryptoEngine::Native.sign(b"parity", &private_pem).unwrap();
        let foreign = CryptoEngine::Foreign.sign(b"parity", &private_pem).unwrap();
        assert_eq!(native, foreign);

        // PKCS#1 v1.5 has no random padding: signing is deterministic.
        let again = CryptoEngine::Native.sign(b"parity", &private_pem).unwrap();
        assert_eq!(native, again);
    }

    #[test]
    fn cross_backend_verification_holds() {
        let (private_pem, public_pem) = key_pems();
        let signature = CryptoEngine::Foreign.sign(b"cross", &private_pem).unwrap();
        assert!(CryptoEngine::Native.verify(b"cross", &signature, &public_pem));
    }

    #[test]
    fn zero_length_inputs_short_circuit() {
        let (private_pem, public_pem) = key_pems();
        for engine in [CryptoEngine::Native, CryptoEngine::Foreign] {
            assert!(engine.sign(b"", &private_pem).is_none());
            assert!(engine.sign(b"abc", b"").is_none());
            assert!(!engine.verify(b"", b"sig", &public_pem));
            assert!(!engine.verify(b"abc", b"", &public_pem));
            assert!(!engine.verify(b"abc", b"sig", b""));
        }
    }

    #[test]
    fn pkcs1_private_keys_are_accepted() {
        use rsa::pkcs1::EncodeRsaPrivateKey;

        let key = test_signing_key();
        let pkcs1_pem = key.to_pkcs1_pem(LineEnding::LF).unwrap().to_string();
        let signature = CryptoEngine::Native
            .sign(b"abc", pkcs1_pem.as_bytes())
            .unwrap();

        let public_pem = key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        assert!(CryptoEngine::Native.verify(b"abc", &signature, public_pem.as_bytes()));
    }

    #[test]
    fn malformed_key_material_fails_closed() {
        assert!(CryptoEngine::Native.sign(b"abc", b"not a pem").is_none());
        assert!(!CryptoEngine::Native.verify(b"abc", b"sig", b"not a pem"));
    }
}
