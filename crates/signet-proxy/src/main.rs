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

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use signet_core::config::SchemaSource;
use signet_core::{Config, CryptoEngine, CryptoMaterials, MethodRegistry};
use signet_proxy::director::ProxyContext;
use signet_proxy::{reflection, server};

#[derive(Debug, Parser)]
#[command(name = "signet-proxy")]
#[command(about = "Message-aware gRPC reverse proxy with envelope verify-and-sign")]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Crypto engine: `native` or `foreign`.
    #[arg(long, default_value = "native")]
    crypto: String,

    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(args.log))
        .init();

    let engine = match args.crypto.as_str() {
        "native" => CryptoEngine::Native,
        "foreign" => CryptoEngine::Foreign,
        other => {
            return Err(format!("unknown crypto engine `{other}`; expected native or foreign").into())
        }
    };

    tracing::info!(config = %args.config.display(), "loading configuration");
    let config = Config::load(&args.config)?;

    let registry = match config.schema.method {
        SchemaSource::Pb => {
            let bytes = std::fs::read(&config.schema.pb_path)?;
            let registry = MethodRegistry::from_descriptor_set_bytes(&bytes)?;
            tracing::info!(
                methods = %registry.len(),
                path = %config.schema.pb_path,
                "loaded descriptor set"
            );
            registry
        }
        SchemaSource::Reflect => {
            let registry = reflection::load_backend_registry(&config.backend.address).await?;
            tracing::info!(
                methods = %registry.len(),
                backend = %config.backend.address,
                "loaded descriptors via server reflection"
            );
            registry
        }
    };

    let materials = CryptoMaterials::load(&config.cms)?;
    tracing::info!(
        trust_anchor = %materials.trust_anchor_pem().is_some(),
        signing_key = %materials.signing_key_pem().is_some(),
        engine = %engine,
        "loaded cryptographic material"
    );

    let listener = tokio::net::TcpListener::bind(&config.server.listen_address).await?;
    let addr = listener.local_addr()?;
    tracing::info!(
        %addr,
        backend = %config.backend.address,
        routes = %config.routes.len(),
        "signet proxy listening"
    );

    let ctx = Arc::new(ProxyContext::new(&config, registry, materials, engine));
    server::serve(listener, ctx, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    })
    .await?;

    Ok(())
}
