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

use std::path::PathBuf;

use thiserror::Error;

pub type SignetResult<T> = Result<T, SignetError>;

/// Startup-fatal failures. Per-frame conditions are never reported through
/// this type; they are logged and the original frame is forwarded instead.
#[derive(Debug, Error)]
pub enum SignetError {
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("failed to load descriptor set: {0}")]
    Descriptor(#[from] prost_reflect::DescriptorError),

    #[error("invalid trust store: {0}")]
    TrustStore(String),

    #[error("invalid proxy private key: {0}")]
    PrivateKey(String),
}
