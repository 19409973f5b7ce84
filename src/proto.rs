//! Wire messages of the `recordgate.v1.RecordApi` gRPC service.
//!
//! The message structs use `prost` derives directly (standard protobuf wire
//! format); the service traits, server and client are generated by
//! `build.rs` and included at the bottom of this module.
use prost_types::Timestamp;

/// Fully qualified gRPC service name.
pub const SERVICE_NAME: &str = "recordgate.v1.RecordApi";

#[derive(Clone, PartialEq, prost::Message)]
pub struct Record {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(string, tag = "2")]
    pub title: String,
    #[prost(string, tag = "3")]
    pub director: String,
    #[prost(message, optional, tag = "4")]
    pub release_date: Option<Timestamp>,
    #[prost(string, tag = "5")]
    pub genre: String,
    #[prost(float, tag = "6")]
    pub rating: f32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateRecordRequest {
    #[prost(string, tag = "1")]
    pub title: String,
    #[prost(string, tag = "2")]
    pub director: String,
    #[prost(message, optional, tag = "3")]
    pub release_date: Option<Timestamp>,
    #[prost(string, tag = "4")]
    pub genre: String,
    #[prost(float, tag = "5")]
    pub rating: f32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetRecordRequest {
    #[prost(int64, tag = "1")]
    pub id: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListRecordsRequest {
    #[prost(int32, tag = "1")]
    pub page_number: i32,
    #[prost(int32, tag = "2")]
    pub page_size: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListRecordsResponse {
    #[prost(message, repeated, tag = "1")]
    pub records: Vec<Record>,
    #[prost(int32, tag = "2")]
    pub total_count: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct UpdateRecordRequest {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(string, tag = "2")]
    pub title: String,
    #[prost(string, tag = "3")]
    pub director: String,
    #[prost(message, optional, tag = "4")]
    pub release_date: Option<Timestamp>,
    #[prost(string, tag = "5")]
    pub genre: String,
    #[prost(float, tag = "6")]
    pub rating: f32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DeleteRecordRequest {
    #[prost(int64, tag = "1")]
    pub id: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DeleteRecordResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
}

include!(concat!(env!("OUT_DIR"), "/recordgate.v1.RecordApi.rs"));

pub use record_api_client::RecordApiClient;
pub use record_api_server::{RecordApi, RecordApiServer};

/// Encoded `FileDescriptorSet` for gRPC server reflection.
pub const FILE_DESCRIPTOR_SET: &[u8] =
    include_bytes!(concat!(env!("OUT_DIR"), "/recordgate_descriptor.bin"));
