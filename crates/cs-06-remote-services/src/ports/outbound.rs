//! # Outbound Port - RemoteService
//!
//! A local service object exported to the cluster. Arguments and return
//! values travel as JSON.

use crate::domain::RemoteServiceError;
use serde_json::Value;

pub trait RemoteService: Send + Sync {
    /// Run `method` with `arguments`.
    ///
    /// # Errors
    ///
    /// `NoSuchMethod` for an unknown method or arity, `Invocation` when the
    /// method itself fails.
    fn invoke(&self, method: &str, arguments: &[Value]) -> Result<Value, RemoteServiceError>;
}
