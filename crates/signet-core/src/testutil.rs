// Copyright (c) 2026 Signet Maintainers and Signet Contributors
// SPDX-License-Identifier: Apache-2.0

//! Hand-assembled descriptor pool shared by unit tests. Mirrors the shape of
//! the echo test protocol without requiring protoc at unit-test time.

use prost_reflect::DescriptorPool;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MethodDescriptorProto, ServiceDescriptorProto,
};

fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        ..Default::default()
    }
}

/// Package `testpb` with a `SecureEnvelope`-shaped message, a tiny `Ping`
/// message usable as an inner payload, and two single-method services.
pub(crate) fn test_pool() -> DescriptorPool {
    let secure_envelope = DescriptorProto {
        name: Some("SecureEnvelope".to_string()),
        field: vec![
            field("payload", 1, Type::Bytes),
            field("type_url", 2, Type::String),
            field("client_signature", 3, Type::Bytes),
            field("proxy_signature", 4, Type::Bytes),
        ],
        ..Default::default()
    };
    let ping = DescriptorProto {
        name: Some("Ping".to_string()),
        field: vec![field("text", 1, Type::String)],
        ..Default::default()
    };

    let secure_service = ServiceDescriptorProto {
        name: Some("SecureService".to_string()),
        method: vec![method(
            "SecureEcho",
            ".testpb.SecureEnvelope",
            ".testpb.SecureEnvelope",
        )],
        ..Default::default()
    };
    let ping_service = ServiceDescriptorProto {
        name: Some("PingService".to_string()),
        method: vec![method("UnaryPing", ".testpb.Ping", ".testpb.Ping")],
        ..Default::default()
    };

    let file = FileDescriptorProto {
        name: Some("testpb.proto".to_string()),
        package: Some("testpb".to_string()),
        message_type: vec![secure_envelope, ping],
        service: vec![secure_service, ping_service],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    };

    DescriptorPool::from_file_descriptor_set(FileDescriptorSet { file: vec![file] })
        .expect("test descriptor pool must assemble")
}
