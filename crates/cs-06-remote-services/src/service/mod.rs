//! Service layer.

pub mod client;
pub mod handler;
pub mod registry;

pub use client::RemoteServiceClient;
pub use handler::RemoteServiceCallHandler;
pub use registry::EndpointRegistry;
