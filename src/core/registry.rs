//! Table binding (HTTP method, path template) pairs to RPC operations.
//!
//! The table is built once at start-up, in declaration order, and sealed on
//! first dispatch. After sealing it is read-only, so resolve and dispatch
//! take no locks.
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use http::Method;
use thiserror::Error;

use crate::{
    core::{
        error::GatewayError,
        operation::{OperationId, OperationRequest, OperationResponse, RequestEnvelope},
        template::{Captures, PathTemplate, TemplateError},
        translator::{self, RequestDecoder, ResponseEncoder},
    },
    ports::record_operations::RecordOperations,
};

/// One HTTP binding of an RPC operation.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub method: Method,
    pub template: PathTemplate,
    pub operation: OperationId,
    pub decoder: RequestDecoder,
    pub encoder: ResponseEncoder,
}

impl OperationDescriptor {
    pub fn new(
        method: Method,
        template: &str,
        operation: OperationId,
        decoder: RequestDecoder,
        encoder: ResponseEncoder,
    ) -> Result<Self, RegistryError> {
        Ok(Self {
            method,
            template: PathTemplate::parse(template)?,
            operation,
            decoder,
            encoder,
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("{method} {template} is ambiguous with already registered {method} {existing}")]
    Ambiguous {
        method: Method,
        template: String,
        existing: String,
    },

    #[error("cannot register {operation} after the registry has been sealed")]
    Sealed { operation: OperationId },
}

/// Result of resolving a request against the table.
#[derive(Debug)]
pub struct MatchResult<'a> {
    pub descriptor: &'a OperationDescriptor,
    pub captures: Captures,
}

impl MatchResult<'_> {
    pub fn operation(&self) -> OperationId {
        self.descriptor.operation
    }
}

pub struct OperationRegistry {
    descriptors: Vec<OperationDescriptor>,
    handler: Arc<dyn RecordOperations>,
    sealed: AtomicBool,
}

impl OperationRegistry {
    pub fn new(handler: Arc<dyn RecordOperations>) -> Self {
        Self {
            descriptors: Vec::new(),
            handler,
            sealed: AtomicBool::new(false),
        }
    }

    /// The five record operations bound to their HTTP routes.
    pub fn standard(handler: Arc<dyn RecordOperations>) -> Result<Self, RegistryError> {
        let mut registry = Self::new(handler);
        let routes = [
            OperationDescriptor::new(
                Method::POST,
                "/v1/records",
                OperationId::CreateRecord,
                translator::decode_create,
                translator::encode_record,
            )?,
            OperationDescriptor::new(
                Method::GET,
                "/v1/records/{id}",
                OperationId::GetRecord,
                translator::decode_get,
                translator::encode_record,
            )?,
            OperationDescriptor::new(
                Method::GET,
                "/v1/records",
                OperationId::ListRecords,
                translator::decode_list,
                translator::encode_record_list,
            )?,
            OperationDescriptor::new(
                Method::PUT,
                "/v1/records/{id}",
                OperationId::UpdateRecord,
                translator::decode_update,
                translator::encode_record,
            )?,
            OperationDescriptor::new(
                Method::DELETE,
                "/v1/records/{id}",
                OperationId::DeleteRecord,
                translator::decode_delete,
                translator::encode_deleted,
            )?,
        ];
        for descriptor in routes {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Add a binding. Rejected once sealed, or when some literal path could
    /// match both the new template and an existing one for the same method.
    pub fn register(&mut self, descriptor: OperationDescriptor) -> Result<(), RegistryError> {
        if self.is_sealed() {
            return Err(RegistryError::Sealed {
                operation: descriptor.operation,
            });
        }
        if let Some(existing) = self.descriptors.iter().find(|d| {
            d.method == descriptor.method && d.template.overlaps(&descriptor.template)
        }) {
            return Err(RegistryError::Ambiguous {
                method: descriptor.method.clone(),
                template: descriptor.template.to_string(),
                existing: existing.template.to_string(),
            });
        }
        tracing::debug!(
            method = %descriptor.method,
            template = %descriptor.template,
            operation = %descriptor.operation,
            "registered route"
        );
        self.descriptors.push(descriptor);
        Ok(())
    }

    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    pub fn descriptors(&self) -> &[OperationDescriptor] {
        &self.descriptors
    }

    pub fn handler(&self) -> &Arc<dyn RecordOperations> {
        &self.handler
    }

    /// Find the binding for a request path. The first registered match wins,
    /// although registration already guarantees at most one can match.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<MatchResult<'_>, GatewayError> {
        self.descriptors
            .iter()
            .filter(|d| d.method == *method)
            .find_map(|descriptor| {
                descriptor.template.matches(path).map(|captures| MatchResult {
                    descriptor,
                    captures,
                })
            })
            .ok_or_else(|| GatewayError::RouteNotFound {
                method: method.to_string(),
                path: path.to_string(),
            })
    }

    /// Invoke the bound handler. Handler errors are forwarded untouched.
    pub async fn dispatch(
        &self,
        envelope: RequestEnvelope,
    ) -> Result<OperationResponse, GatewayError> {
        if !self.sealed.swap(true, Ordering::AcqRel) {
            tracing::debug!(routes = self.descriptors.len(), "operation registry sealed");
        }

        let RequestEnvelope {
            operation,
            request,
            context,
        } = envelope;
        if request.operation() != operation {
            return Err(GatewayError::internal(format!(
                "request for {} dispatched as {operation}",
                request.operation()
            )));
        }

        let handler = self.handler.as_ref();
        let response = match request {
            OperationRequest::Create(req) => handler
                .create_record(&context, req)
                .await
                .map(OperationResponse::Record)?,
            OperationRequest::Get(req) => handler
                .get_record(&context, req)
                .await
                .map(OperationResponse::Record)?,
            OperationRequest::List(req) => handler
                .list_records(&context, req)
                .await
                .map(OperationResponse::RecordList)?,
            OperationRequest::Update(req) => handler
                .update_record(&context, req)
                .await
                .map(OperationResponse::Record)?,
            OperationRequest::Delete(req) => handler
                .delete_record(&context, req)
                .await
                .map(OperationResponse::Deleted)?,
        };
        Ok(response)
    }
}
