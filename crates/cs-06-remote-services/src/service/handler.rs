//! Answers `RemoteServiceCall` commands with the local service's result.

use crate::domain::RemoteServiceError;
use crate::service::EndpointRegistry;
use cs_04_commands::CommandHandler;
use shared_types::{Command, CommandKind, CommandPayload, HandlerError, ResultPayload, Switch};
use std::sync::Arc;
use tracing::{trace, warn};

pub struct RemoteServiceCallHandler {
    registry: Arc<EndpointRegistry>,
    switch: Switch,
}

impl RemoteServiceCallHandler {
    pub const NAME: &'static str = "dosgi";

    #[must_use]
    pub fn new(registry: Arc<EndpointRegistry>) -> Self {
        Self {
            registry,
            switch: Switch::new(Self::NAME),
        }
    }

    #[must_use]
    pub fn with_switch(mut self, switch: Switch) -> Self {
        self.switch = switch;
        self
    }

    fn failure(error: RemoteServiceError) -> HandlerError {
        HandlerError::failed(Self::NAME, error.to_string())
    }
}

impl CommandHandler for RemoteServiceCallHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> CommandKind {
        CommandKind::RemoteServiceCall
    }

    fn switch(&self) -> &Switch {
        &self.switch
    }

    fn execute(&self, command: &Command) -> Result<ResultPayload, HandlerError> {
        let CommandPayload::RemoteServiceCall {
            endpoint_id,
            method,
            arguments,
        } = &command.payload
        else {
            return Err(HandlerError::UnsupportedPayload {
                handler: Self::NAME.to_string(),
            });
        };
        let service = self
            .registry
            .local_service(endpoint_id)
            .ok_or_else(|| Self::failure(RemoteServiceError::EndpointNotFound(endpoint_id.clone())))?;

        trace!(endpoint = %endpoint_id, method = %method, "Handling remote service call");
        match service.invoke(method, arguments) {
            Ok(body) => Ok(ResultPayload::Custom { body }),
            Err(e) => {
                warn!(endpoint = %endpoint_id, method = %method, error = %e, "Remote service call failed");
                Err(Self::failure(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RemoteService;
    use serde_json::{json, Value};
    use shared_bus::InMemoryMaps;
    use shared_types::NodeId;
    use std::collections::BTreeMap;

    struct Calculator;

    impl RemoteService for Calculator {
        fn invoke(&self, method: &str, arguments: &[Value]) -> Result<Value, RemoteServiceError> {
            match (method, arguments) {
                ("add", [a, b]) => Ok(json!(a.as_i64().unwrap_or(0) + b.as_i64().unwrap_or(0))),
                ("fail", []) => Err(RemoteServiceError::Invocation {
                    method: method.to_string(),
                    reason: "out of order".to_string(),
                }),
                _ => Err(RemoteServiceError::NoSuchMethod {
                    method: method.to_string(),
                    arity: arguments.len(),
                }),
            }
        }
    }

    fn handler() -> RemoteServiceCallHandler {
        let maps = InMemoryMaps::new();
        let registry = Arc::new(EndpointRegistry::new(NodeId::new("node-a"), &maps));
        registry
            .export("org.acme.Calculator", "1.0", BTreeMap::new(), Arc::new(Calculator))
            .unwrap();
        RemoteServiceCallHandler::new(registry)
    }

    fn call(endpoint_id: &str, method: &str, arguments: Vec<Value>) -> Command {
        Command::new(CommandPayload::RemoteServiceCall {
            endpoint_id: endpoint_id.to_string(),
            method: method.to_string(),
            arguments,
        })
    }

    #[test]
    fn test_call_returns_service_result() {
        let result = handler()
            .execute(&call("org.acme.Calculator/1.0", "add", vec![json!(2), json!(3)]))
            .unwrap();
        assert_eq!(result, ResultPayload::Custom { body: json!(5) });
    }

    #[test]
    fn test_unknown_method_reported() {
        let err = handler()
            .execute(&call("org.acme.Calculator/1.0", "mul", vec![json!(2)]))
            .unwrap_err();
        assert!(err.to_string().contains("No method mul taking 1 arguments"));
    }

    #[test]
    fn test_service_failure_reported() {
        let err = handler()
            .execute(&call("org.acme.Calculator/1.0", "fail", vec![]))
            .unwrap_err();
        assert!(err.to_string().contains("out of order"));
    }

    #[test]
    fn test_endpoint_not_exported_here() {
        let err = handler()
            .execute(&call("org.acme.Clock/1.0", "now", vec![]))
            .unwrap_err();
        assert!(err.to_string().contains("Endpoint not found"));
    }

    #[test]
    fn test_other_payload_rejected() {
        let err = handler().execute(&Command::new(CommandPayload::Ping)).unwrap_err();
        assert!(matches!(err, HandlerError::UnsupportedPayload { .. }));
    }
}
