//! # Remote Service Client
//!
//! Calls a method of an endpoint on one of its remote providers. The
//! provider is the lowest node id among the endpoint's providers other
//! than the local node.

use crate::domain::RemoteServiceError;
use crate::service::EndpointRegistry;
use cs_04_commands::ExecutionContext;
use serde_json::Value;
use shared_types::{Command, CommandPayload, ResultPayload, DEFAULT_COMMAND_TIMEOUT};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct RemoteServiceClient {
    registry: Arc<EndpointRegistry>,
    context: Arc<dyn ExecutionContext>,
    timeout: Duration,
}

impl RemoteServiceClient {
    #[must_use]
    pub fn new(registry: Arc<EndpointRegistry>, context: Arc<dyn ExecutionContext>) -> Self {
        Self {
            registry,
            context,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Invoke `method` of endpoint `endpoint_id` remotely.
    ///
    /// # Errors
    ///
    /// `EndpointNotFound` or `NoProvider` before anything is sent,
    /// `Execution` when the command cannot be sent, `NoResponse` on
    /// timeout, `Remote` when the provider reports a failure.
    pub async fn call(
        &self,
        endpoint_id: &str,
        method: &str,
        arguments: Vec<Value>,
    ) -> Result<Value, RemoteServiceError> {
        let endpoint = self
            .registry
            .find(endpoint_id)?
            .ok_or_else(|| RemoteServiceError::EndpointNotFound(endpoint_id.to_string()))?;
        let provider = endpoint
            .remote_providers(self.registry.local_node())
            .next()
            .cloned()
            .ok_or_else(|| RemoteServiceError::NoProvider(endpoint_id.to_string()))?;

        let command = Command::new(CommandPayload::RemoteServiceCall {
            endpoint_id: endpoint_id.to_string(),
            method: method.to_string(),
            arguments,
        })
        .with_destination([provider.clone()])
        .with_timeout(self.timeout);
        debug!(endpoint = %endpoint_id, method, provider = %provider, "Calling remote service");

        let report = self.context.execute(command).await?;
        let result = report
            .result_for(&provider)
            .ok_or_else(|| RemoteServiceError::NoResponse {
                endpoint: endpoint_id.to_string(),
                node: provider.clone(),
            })?;
        match &result.payload {
            ResultPayload::Custom { body } => Ok(body.clone()),
            ResultPayload::Failed { message } => Err(RemoteServiceError::Remote {
                node: provider,
                message: message.clone(),
            }),
            other => Err(RemoteServiceError::Remote {
                node: provider,
                message: format!("unexpected result {other:?}"),
            }),
        }
    }
}
