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

//! The proxy's foreign crypto surface: RSA-SHA256 PKCS#1 v1.5 verify/sign
//! behind a flat C ABI of pointers and lengths.
//!
//! The crate builds as both an rlib and a cdylib so the same symbols serve
//! in-process callers (the proxy's `foreign` engine routes through
//! [`verify_via_abi`]/[`sign_via_abi`]) and out-of-process embedders loading
//! the shared library.
//!
//! Ownership contract: the caller owns every input buffer for the duration
//! of the call; `signet_sign_payload` hands back an allocation the caller
//! must release with `signet_release_signature` after copying it out.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use std::slice;
use std::str;

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

/// Verifies an RSA-SHA256 PKCS#1 v1.5 signature.
///
/// `pub_key` must point at a PEM-encoded SubjectPublicKeyInfo. Returns
/// `false` on null pointers, malformed PEM, or verification failure.
///
/// # Safety
///
/// Each non-null pointer must reference a readable buffer of at least the
/// paired length, live for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn signet_verify_signature(
    payload_ptr: *const u8,
    payload_len: usize,
    sig_ptr: *const u8,
    sig_len: usize,
    pub_key_ptr: *const u8,
    pub_key_len: usize,
) -> bool {
    if payload_ptr.is_null() || sig_ptr.is_null() || pub_key_ptr.is_null() {
        return false;
    }

    let payload = unsafe { slice::from_raw_parts(payload_ptr, payload_len) };
    let sig = unsafe { slice::from_raw_parts(sig_ptr, sig_len) };
    let pub_key_bytes = unsafe { slice::from_raw_parts(pub_key_ptr, pub_key_len) };

    let Ok(pub_key_str) = str::from_utf8(pub_key_bytes) else {
        return false;
    };
    let Ok(public_key) = RsaPublicKey::from_public_key_pem(pub_key_str) else {
        return false;
    };

    let digest = Sha256::digest(payload);
    public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, sig)
        .is_ok()
}

/// Signs `payload` with a PEM-encoded private key (PKCS#8 tried first, then
/// PKCS#1). On success writes the signature allocation into the out
/// parameters and returns `true`; the caller owns releasing it via
/// [`signet_release_signature`].
///
/// # Safety
///
/// Input pointers as for [`signet_verify_signature`]; the three out
/// pointers must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn signet_sign_payload(
    payload_ptr: *const u8,
    payload_len: usize,
    priv_key_ptr: *const u8,
    priv_key_len: usize,
    out_sig_ptr: *mut *mut u8,
    out_sig_len: *mut usize,
    out_sig_cap: *mut usize,
) -> bool {
    if payload_ptr.is_null()
        || priv_key_ptr.is_null()
        || out_sig_ptr.is_null()
        || out_sig_len.is_null()
        || out_sig_cap.is_null()
    {
        return false;
    }

    let payload = unsafe { slice::from_raw_parts(payload_ptr, payload_len) };
    let priv_key_bytes = unsafe { slice::from_raw_parts(priv_key_ptr, priv_key_len) };

    let Ok(priv_key_str) = str::from_utf8(priv_key_bytes) else {
        return false;
    };
    let Ok(private_key) = RsaPrivateKey::from_pkcs8_pem(priv_key_str)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(priv_key_str))
    else {
        return false;
    };

    let digest = Sha256::digest(payload);
    let Ok(mut sig_vec) = private_key.sign(Pkcs1v15Sign::new::<Sha256>(), &digest) else {
        return false;
    };

    sig_vec.shrink_to_fit();
    let ptr = sig_vec.as_mut_ptr();
    let len = sig_vec.len();
    let cap = sig_vec.capacity();

    unsafe {
        *out_sig_ptr = ptr;
        *out_sig_len = len;
        *out_sig_cap = cap;
    }

    std::mem::forget(sig_vec);
    true
}

/// Releases an allocation returned by [`signet_sign_payload`].
///
/// # Safety
///
/// `(sig_ptr, sig_len, sig_cap)` must be exactly the triple produced by one
/// successful `signet_sign_payload` call, released at most once.
#[no_mangle]
pub unsafe extern "C" fn signet_release_signature(
    sig_ptr: *mut u8,
    sig_len: usize,
    sig_cap: usize,
) {
    if !sig_ptr.is_null() {
        unsafe {
            let _ = Vec::from_raw_parts(sig_ptr, sig_len, sig_cap);
        }
    }
}

/// Safe wrapper used by the in-process `foreign` engine: drives the ABI
/// exactly as an external embedder would. Zero-length inputs short-circuit
/// without crossing the boundary.
pub fn verify_via_abi(payload: &[u8], signature: &[u8], public_key_pem: &[u8]) -> bool {
    if payload.is_empty() || signature.is_empty() || public_key_pem.is_empty() {
        return false;
    }
    unsafe {
        signet_verify_signature(
            payload.as_ptr(),
            payload.len(),
            signature.as_ptr(),
            signature.len(),
            public_key_pem.as_ptr(),
            public_key_pem.len(),
        )
    }
}

/// Safe wrapper over [`signet_sign_payload`]: copies the returned signature
/// into caller-owned memory, then releases the ABI allocation.
pub fn sign_via_abi(payload: &[u8], private_key_pem: &[u8]) -> Option<Vec<u8>> {
    if payload.is_empty() || private_key_pem.is_empty() {
        return None;
    }

    let mut sig_ptr: *mut u8 = std::ptr::null_mut();
    let mut sig_len: usize = 0;
    let mut sig_cap: usize = 0;

    let ok = unsafe {
        signet_sign_payload(
            payload.as_ptr(),
            payload.len(),
            private_key_pem.as_ptr(),
            private_key_pem.len(),
            &mut sig_ptr,
            &mut sig_len,
            &mut sig_cap,
        )
    };
    if !ok || sig_ptr.is_null() {
        return None;
    }

    let signature = unsafe { slice::from_raw_parts(sig_ptr, sig_len) }.to_vec();
    unsafe {
        signet_release_signature(sig_ptr, sig_len, sig_cap);
    }
    Some(signature)
}
