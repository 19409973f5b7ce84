pub mod context;
pub mod error;
pub mod operation;
pub mod record;
pub mod registry;
pub mod service;
pub mod template;
pub mod translator;

pub use context::RequestContext;
pub use error::{ErrorKind, GatewayError, ServiceError};
pub use operation::{OperationId, OperationRequest, OperationResponse, RequestEnvelope};
pub use registry::{OperationDescriptor, OperationRegistry, RegistryError};
pub use service::RecordService;
pub use template::{Captures, PathTemplate, TemplateError};
