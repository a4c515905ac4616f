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

//! YAML configuration model. Loaded once at startup, immutable afterwards.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{SignetError, SignetResult};
use crate::route::RouteRule;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub schema: SchemaConfig,
    #[serde(default)]
    pub routes: Vec<RouteRule>,
    #[serde(default)]
    pub cms: CmsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub listen_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub address: String,
}

/// Where method descriptors come from: a compiled descriptor set on disk
/// (push model) or gRPC server reflection against the backend (pull model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaSource {
    Pb,
    Reflect,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    pub method: SchemaSource,
    #[serde(default)]
    pub pb_path: String,
}

/// Cryptographic material sources. All paths optional; an unset trust store
/// disables client-signature verification, an unset private key makes the
/// sign stage emit the diagnostic mock signature.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CmsConfig {
    #[serde(default)]
    pub client_trust_store: String,
    #[serde(default)]
    pub proxy_private_key: String,
    /// Reserved for future mutual-auth work; read but unused by the core.
    #[serde(default)]
    pub proxy_certificate: String,
}

impl Config {
    pub fn load(path: &Path) -> SignetResult<Self> {
        let raw = fs::read_to_string(path).map_err(|source| SignetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> SignetResult<()> {
        if self.server.listen_address.is_empty() {
            return Err(SignetError::ConfigInvalid(
                "server.listen_address must not be empty".to_string(),
            ));
        }
        if self.backend.address.is_empty() {
            return Err(SignetError::ConfigInvalid(
                "backend.address must not be empty".to_string(),
            ));
        }
        if self.schema.method == SchemaSource::Pb && self.schema.pb_path.is_empty() {
            return Err(SignetError::ConfigInvalid(
                "schema.pb_path is required when schema.method is `pb`".to_string(),
            ));
        }
        Ok(())
    }
}
