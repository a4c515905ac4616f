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

//! Generated echo/secure-echo protocol used to exercise the proxy end to
//! end. The proxy itself never links against these types; it relays them as
//! raw bytes.

#![forbid(unsafe_code)]

pub mod pb {
    tonic::include_proto!("echo");
}

/// Wire encoding of the compiled `FileDescriptorSet` for `echo.proto`,
/// suitable for the registry's push model and for reflection servers.
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("echo_descriptor");
