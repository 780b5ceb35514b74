//! # Remote Services
//!
//! Services a node exports are recorded in the cluster map
//! `dosgi.endpoints`, keyed by `service_class/version`. Each entry lists the
//! nodes currently providing the service:
//!
//! | Transition | Effect on the entry |
//! |------------|---------------------|
//! | first export | created with the exporting node |
//! | export by another node | node added to `providers` |
//! | withdraw | node removed, entry dropped when no provider is left |
//! | node left the cluster | node removed everywhere, empty entries dropped |
//!
//! A call travels as a `RemoteServiceCall` command to one provider and
//! comes back as the command's result.
//!
//! ```text
//! RemoteServiceClient::call ─► ExecutionContext ─► provider node
//!                                                   RemoteServiceCallHandler
//!                                                     └─► RemoteService::invoke
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    endpoint_id, EndpointDescription, Filter, RemoteServiceError, ENDPOINTS_MAP_NAME,
    OBJECT_CLASS, SERVICE_VERSION,
};
pub use ports::RemoteService;
pub use service::{EndpointRegistry, RemoteServiceCallHandler, RemoteServiceClient};
