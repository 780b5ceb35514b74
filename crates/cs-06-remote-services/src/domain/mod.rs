//! Domain layer.

pub mod endpoint;
pub mod errors;
pub mod filter;

pub use endpoint::{endpoint_id, EndpointDescription, ENDPOINTS_MAP_NAME, OBJECT_CLASS, SERVICE_VERSION};
pub use errors::RemoteServiceError;
pub use filter::Filter;
