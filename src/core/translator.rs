//! HTTP/JSON to RPC message translation and back.
//!
//! Decoders turn path captures, the query string and the JSON body into the
//! RPC request message of one operation. Encoders turn the RPC result into
//! the JSON value sent to the client. All of it is pure: nothing here touches
//! listener state or the registry.
use axum::{
    Json,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    core::{
        error::GatewayError,
        operation::{OperationRequest, OperationResponse},
        record::{self, Page},
        template::Captures,
    },
    proto,
};

/// The pieces of an HTTP request a decoder may read.
#[derive(Debug, Clone, Copy)]
pub struct HttpRequestParts<'a> {
    pub captures: &'a Captures,
    pub query: Option<&'a str>,
    pub body: &'a [u8],
}

pub type RequestDecoder = fn(&HttpRequestParts<'_>) -> Result<OperationRequest, GatewayError>;
pub type ResponseEncoder = fn(OperationResponse) -> Result<Value, GatewayError>;

const ID_VARIABLE: &str = "id";
const PAGE_NUMBER_PARAMS: [&str; 2] = ["pageNumber", "page_number"];
const PAGE_SIZE_PARAMS: [&str; 2] = ["pageSize", "page_size"];

// Request decoders.

pub fn decode_create(parts: &HttpRequestParts<'_>) -> Result<OperationRequest, GatewayError> {
    let body: RecordBody = parse_body(parts.body)?;
    let release_date = body.release_date()?;
    Ok(OperationRequest::Create(proto::CreateRecordRequest {
        title: body.title.unwrap_or_default(),
        director: body.director.unwrap_or_default(),
        release_date,
        genre: body.genre.unwrap_or_default(),
        rating: body.rating.unwrap_or_default(),
    }))
}

pub fn decode_get(parts: &HttpRequestParts<'_>) -> Result<OperationRequest, GatewayError> {
    let id = path_i64(parts.captures, ID_VARIABLE)?;
    Ok(OperationRequest::Get(proto::GetRecordRequest { id }))
}

pub fn decode_list(parts: &HttpRequestParts<'_>) -> Result<OperationRequest, GatewayError> {
    let mut page_number = None;
    let mut page_size = None;

    if let Some(query) = parts.query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if PAGE_NUMBER_PARAMS.contains(&key.as_ref()) {
                page_number = query_i32(&key, &value)?;
            } else if PAGE_SIZE_PARAMS.contains(&key.as_ref()) {
                page_size = query_i32(&key, &value)?;
            }
        }
    }

    let page = Page::resolve(
        page_number.unwrap_or_default().into(),
        page_size.unwrap_or_default().into(),
    );
    Ok(OperationRequest::List(proto::ListRecordsRequest {
        page_number: i32::try_from(page.number).unwrap_or(i32::MAX),
        page_size: i32::try_from(page.size).unwrap_or(i32::MAX),
    }))
}

pub fn decode_update(parts: &HttpRequestParts<'_>) -> Result<OperationRequest, GatewayError> {
    let id = path_i64(parts.captures, ID_VARIABLE)?;
    let body: RecordBody = parse_body(parts.body)?;
    let release_date = body.release_date()?;
    Ok(OperationRequest::Update(proto::UpdateRecordRequest {
        id,
        title: body.title.unwrap_or_default(),
        director: body.director.unwrap_or_default(),
        release_date,
        genre: body.genre.unwrap_or_default(),
        rating: body.rating.unwrap_or_default(),
    }))
}

pub fn decode_delete(parts: &HttpRequestParts<'_>) -> Result<OperationRequest, GatewayError> {
    let id = path_i64(parts.captures, ID_VARIABLE)?;
    Ok(OperationRequest::Delete(proto::DeleteRecordRequest { id }))
}

// Response encoders.

pub fn encode_record(response: OperationResponse) -> Result<Value, GatewayError> {
    match response {
        OperationResponse::Record(record) => to_json(&RecordJson::from(record)),
        other => Err(unexpected_response(&other)),
    }
}

pub fn encode_record_list(response: OperationResponse) -> Result<Value, GatewayError> {
    match response {
        OperationResponse::RecordList(list) => to_json(&RecordListJson {
            records: list.records.into_iter().map(RecordJson::from).collect(),
            total_count: list.total_count,
        }),
        other => Err(unexpected_response(&other)),
    }
}

pub fn encode_deleted(response: OperationResponse) -> Result<Value, GatewayError> {
    match response {
        OperationResponse::Deleted(deleted) => to_json(&DeletedJson {
            success: deleted.success,
        }),
        other => Err(unexpected_response(&other)),
    }
}

fn unexpected_response(response: &OperationResponse) -> GatewayError {
    GatewayError::internal(format!("encoder received unexpected response {response:?}"))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, GatewayError> {
    serde_json::to_value(value)
        .map_err(|e| GatewayError::internal(format!("failed to encode response: {e}")))
}

/// Successful gateway response: the encoded value with no extra wrapping.
pub fn json_response(value: Value) -> Response {
    Json(value).into_response()
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

// JSON shapes.

/// JSON form of a record, as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordJson {
    pub id: i64,
    pub title: String,
    pub director: String,
    pub release_date: Option<String>,
    pub genre: String,
    pub rating: f32,
}

impl From<proto::Record> for RecordJson {
    fn from(record: proto::Record) -> Self {
        Self {
            id: record.id,
            title: record.title,
            director: record.director,
            release_date: record
                .release_date
                .as_ref()
                .and_then(record::from_timestamp)
                .map(format_timestamp),
            genre: record.genre,
            rating: record.rating,
        }
    }
}

impl RecordJson {
    /// Decode back into the RPC message.
    pub fn into_proto(self) -> Result<proto::Record, GatewayError> {
        Ok(proto::Record {
            id: self.id,
            title: self.title,
            director: self.director,
            release_date: self
                .release_date
                .as_deref()
                .map(|raw| parse_timestamp("releaseDate", raw))
                .transpose()?,
            genre: self.genre,
            rating: self.rating,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordListJson {
    pub records: Vec<RecordJson>,
    pub total_count: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedJson {
    pub success: bool,
}

/// Write-style request body. Every field is optional and unknown fields are
/// ignored; `null` means unset. A body `id` is never read: update takes its
/// id from the path.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RecordBody {
    title: Option<String>,
    director: Option<String>,
    #[serde(alias = "release_date")]
    release_date: Option<String>,
    genre: Option<String>,
    rating: Option<f32>,
}

impl RecordBody {
    fn release_date(&self) -> Result<Option<prost_types::Timestamp>, GatewayError> {
        match self.release_date.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => parse_timestamp("releaseDate", raw).map(Some),
        }
    }
}

fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| GatewayError::invalid_argument(format!("malformed JSON body: {e}")))
}

fn path_i64(captures: &Captures, name: &str) -> Result<i64, GatewayError> {
    let raw = captures
        .get(name)
        .ok_or_else(|| GatewayError::internal(format!("missing path variable '{name}'")))?;
    let mismatch = || GatewayError::invalid_argument(format!("type mismatch, parameter: {name}"));
    let decoded = urlencoding::decode(raw).map_err(|_| mismatch())?;
    decoded.parse::<i64>().map_err(|_| mismatch())
}

fn query_i32(name: &str, value: &str) -> Result<Option<i32>, GatewayError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.parse::<i32>().map(Some).map_err(|_| {
        GatewayError::invalid_argument(format!("invalid value for parameter {name}: '{value}'"))
    })
}

fn parse_timestamp(field: &str, raw: &str) -> Result<prost_types::Timestamp, GatewayError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| record::to_timestamp(dt.with_timezone(&Utc)))
        .map_err(|e| GatewayError::invalid_argument(format!("invalid {field} '{raw}': {e}")))
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
