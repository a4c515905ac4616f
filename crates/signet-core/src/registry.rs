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

//! Immutable mapping from fully-qualified method ids to method descriptors.
//!
//! Built once at startup from a compiled `FileDescriptorSet` or from a
//! descriptor pool assembled over server reflection; never mutated after
//! construction, so lookups are freely concurrent.

use std::collections::{HashMap, HashSet};

use prost_reflect::{DescriptorPool, MessageDescriptor, MethodDescriptor};

use crate::error::SignetResult;

pub struct MethodRegistry {
    methods: HashMap<String, MethodDescriptor>,
    /// Every message referenced as a method input or output, in pool
    /// iteration order. Backs the by-suffix lookup used for inner-payload
    /// inspection; on suffix collision the first hit wins.
    messages: Vec<MessageDescriptor>,
}

impl MethodRegistry {
    /// Builds the registry from the wire encoding of a `FileDescriptorSet`
    /// (the push model: a `.pb` file compiled ahead of time).
    pub fn from_descriptor_set_bytes(bytes: &[u8]) -> SignetResult<Self> {
        let pool = DescriptorPool::decode(bytes)?;
        Ok(Self::from_pool(&pool))
    }

    /// Indexes every method of every service in the pool under its
    /// `/package.Service/Method` id.
    pub fn from_pool(pool: &DescriptorPool) -> Self {
        let mut methods = HashMap::new();
        let mut messages = Vec::new();
        let mut seen = HashSet::new();

        for service in pool.services() {
            for method in service.methods() {
                for message in [method.input(), method.output()] {
                    if seen.insert(message.full_name().to_string()) {
                        messages.push(message);
                    }
                }
                let id = format!("/{}/{}", service.full_name(), method.name());
                methods.insert(id, method);
            }
        }

        Self { methods, messages }
    }

    pub fn method(&self, id: &str) -> Option<&MethodDescriptor> {
        self.methods.get(id)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Best-effort lookup of a message descriptor whose fully-qualified name
    /// ends with `suffix` (the last `/`-segment of a type URL). Returns the
    /// first hit in registry order; collisions are acceptable because this
    /// only feeds inspection logging.
    pub fn message_by_suffix(&self, suffix: &str) -> Option<MessageDescriptor> {
        if suffix.is_empty() {
            return None;
        }
        self.messages
            .iter()
            .find(|message| message.full_name().ends_with(suffix))
            .cloned()
    }
}
