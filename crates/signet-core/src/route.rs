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

use core::fmt;

use serde::Deserialize;

/// What the proxy does with frames on a matched method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RouteMode {
    /// Forward bytes untouched; no decode is attempted.
    #[serde(rename = "pass-thru")]
    PassThru,
    /// Decode and log the envelope, then forward the original bytes.
    #[serde(rename = "inspect-outer")]
    InspectOuter,
    /// Decode, verify the client signature, inject a proxy signature,
    /// re-encode. Falls back to the original bytes on any failure.
    #[serde(rename = "inspect-verify-sign")]
    InspectVerifySign,
}

impl fmt::Display for RouteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouteMode::PassThru => "pass-thru",
            RouteMode::InspectOuter => "inspect-outer",
            RouteMode::InspectVerifySign => "inspect-verify-sign",
        };
        f.write_str(name)
    }
}

/// Field-name mapping from configuration onto the target message.
///
/// An empty string means "not mapped": reads return the typed zero and
/// writes are treated as a field-write failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EnvelopeMap {
    #[serde(default)]
    pub payload_field: String,
    #[serde(default)]
    pub type_url_field: String,
    #[serde(default)]
    pub client_sig_field: String,
    #[serde(default)]
    pub proxy_sig_field: String,
    #[serde(default)]
    pub metadata_field: String,
}

/// One configured route. Immutable value-semantics record; the matcher hands
/// out clones, never references into the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteRule {
    #[serde(rename = "match")]
    pub pattern: String,
    pub mode: RouteMode,
    #[serde(default)]
    pub envelope: EnvelopeMap,
}

impl RouteRule {
    /// The synthetic default applied when no configured rule matches.
    pub fn pass_through() -> Self {
        Self {
            pattern: String::new(),
            mode: RouteMode::PassThru,
            envelope: EnvelopeMap::default(),
        }
    }
}

/// Ordered route rules, consulted in declaration order; first match wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the first rule matching `method` (a `/pkg.Service/Method` id),
    /// or the synthetic pass-through when none does.
    ///
    /// A pattern ending in `/*` matches any method under that service prefix;
    /// the separating slash is part of the prefix, so `/foo.Bar/*` does not
    /// match `/foo.Barnacle/Baz`. Any other pattern must match exactly.
    pub fn matched(&self, method: &str) -> RouteRule {
        for rule in &self.rules {
            if let Some(stem) = rule.pattern.strip_suffix('*') {
                if method.starts_with(stem) {
                    return rule.clone();
                }
            } else if rule.pattern == method {
                return rule.clone();
            }
        }
        RouteRule::pass_through()
    }
}
