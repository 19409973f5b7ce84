//! Generates the `recordgate.v1.RecordApi` gRPC server and client, plus the
//! encoded file descriptor set served by gRPC reflection.
//!
//! Message types are declared by hand in `src/proto.rs` with
//! `prost` derives, so no `.proto` file or `protoc` binary is needed. The
//! descriptor below mirrors those structs field for field and is written to
//! `$OUT_DIR/recordgate_descriptor.bin`.

use std::path::PathBuf;

use prost::Message;
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MethodDescriptorProto, ServiceDescriptorProto,
    field_descriptor_proto::{Label, Type},
};
use tonic_build::manual::{Builder, Method, Service};

const CODEC: &str = "tonic_prost::ProstCodec";
const PACKAGE: &str = "recordgate.v1";
const TIMESTAMP: &str = ".google.protobuf.Timestamp";

/// (rust name, rpc name, input, output)
const METHODS: [(&str, &str, &str, &str); 5] = [
    ("create_record", "CreateRecord", "CreateRecordRequest", "Record"),
    ("get_record", "GetRecord", "GetRecordRequest", "Record"),
    ("list_records", "ListRecords", "ListRecordsRequest", "ListRecordsResponse"),
    ("update_record", "UpdateRecord", "UpdateRecordRequest", "Record"),
    ("delete_record", "DeleteRecord", "DeleteRecordRequest", "DeleteRecordResponse"),
];

fn unary(name: &str, route: &str, input: &str, output: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::proto::{input}"))
        .output_type(format!("crate::proto::{output}"))
        .codec_path(CODEC)
        .build()
}

fn field(name: &str, json_name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        json_name: Some(json_name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn message_field(name: &str, json_name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, json_name, number, Type::Message)
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

/// Record payload fields shared by `Record`, create and update, starting at `first` tag.
fn payload_fields(first: i32) -> Vec<FieldDescriptorProto> {
    vec![
        field("title", "title", first, Type::String),
        field("director", "director", first + 1, Type::String),
        message_field("release_date", "releaseDate", first + 2, TIMESTAMP),
        field("genre", "genre", first + 3, Type::String),
        field("rating", "rating", first + 4, Type::Float),
    ]
}

fn with_id(rest: Vec<FieldDescriptorProto>) -> Vec<FieldDescriptorProto> {
    let mut fields = vec![field("id", "id", 1, Type::Int64)];
    fields.extend(rest);
    fields
}

fn timestamp_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("google/protobuf/timestamp.proto".to_string()),
        package: Some("google.protobuf".to_string()),
        message_type: vec![message(
            "Timestamp",
            vec![
                field("seconds", "seconds", 1, Type::Int64),
                field("nanos", "nanos", 2, Type::Int32),
            ],
        )],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

fn record_api_file() -> FileDescriptorProto {
    let mut records = message_field("records", "records", 1, ".recordgate.v1.Record");
    records.label = Some(Label::Repeated as i32);

    let service = ServiceDescriptorProto {
        name: Some("RecordApi".to_string()),
        method: METHODS
            .iter()
            .map(|(_, route, input, output)| MethodDescriptorProto {
                name: Some(route.to_string()),
                input_type: Some(format!(".{PACKAGE}.{input}")),
                output_type: Some(format!(".{PACKAGE}.{output}")),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some("recordgate/v1/record_api.proto".to_string()),
        package: Some(PACKAGE.to_string()),
        dependency: vec!["google/protobuf/timestamp.proto".to_string()],
        message_type: vec![
            message("Record", with_id(payload_fields(2))),
            message("CreateRecordRequest", payload_fields(1)),
            message("GetRecordRequest", with_id(Vec::new())),
            message(
                "ListRecordsRequest",
                vec![
                    field("page_number", "pageNumber", 1, Type::Int32),
                    field("page_size", "pageSize", 2, Type::Int32),
                ],
            ),
            message(
                "ListRecordsResponse",
                vec![records, field("total_count", "totalCount", 2, Type::Int32)],
            ),
            message("UpdateRecordRequest", with_id(payload_fields(2))),
            message("DeleteRecordRequest", with_id(Vec::new())),
            message(
                "DeleteRecordResponse",
                vec![field("success", "success", 1, Type::Bool)],
            ),
        ],
        service: vec![service],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let service = METHODS
        .iter()
        .fold(
            Service::builder().name("RecordApi").package(PACKAGE),
            |builder, (name, route, input, output)| {
                builder.method(unary(name, route, input, output))
            },
        )
        .build();
    Builder::new().compile(&[service]);

    let descriptor = FileDescriptorSet {
        file: vec![timestamp_file(), record_api_file()],
    };
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    std::fs::write(
        out_dir.join("recordgate_descriptor.bin"),
        descriptor.encode_to_vec(),
    )?;

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
