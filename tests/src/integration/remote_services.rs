//! # Remote Services
//!
//! Services exported by one node, found and called from another through
//! the shared endpoint registry.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use cs_06_remote_services::{RemoteService, RemoteServiceError};
    use serde_json::{json, Value};

    use crate::harness::TestCluster;

    const ENDPOINT: &str = "org.acme.Greeter/1.0";

    struct Greeter {
        node: &'static str,
    }

    impl RemoteService for Greeter {
        fn invoke(&self, method: &str, arguments: &[Value]) -> Result<Value, RemoteServiceError> {
            match (method, arguments) {
                ("greet", [Value::String(name)]) => Ok(json!(format!("{} greets {name}", self.node))),
                _ => Err(RemoteServiceError::NoSuchMethod {
                    method: method.to_string(),
                    arity: arguments.len(),
                }),
            }
        }
    }

    fn export(cluster: &TestCluster, index: usize, node: &'static str) {
        cluster
            .node(index)
            .endpoints()
            .export(
                "org.acme.Greeter",
                "1.0",
                BTreeMap::from([("region".to_string(), "eu".to_string())]),
                Arc::new(Greeter { node }),
            )
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_exported_service_called_from_peer() {
        let cluster = TestCluster::start(&["node-a", "node-b"]).await;
        let a = cluster.node(0);
        export(&cluster, 1, "node-b");

        let found = a.endpoints().lookup("(&(objectClass=org.acme.Greeter)(region=eu))").unwrap();
        assert_eq!(found.len(), 1);

        let value = a
            .remote_services()
            .call(ENDPOINT, "greet", vec![json!("node-a")])
            .await
            .unwrap();
        assert_eq!(value, json!("node-b greets node-a"));

        let err = a
            .remote_services()
            .call(ENDPOINT, "wave", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteServiceError::Remote { .. }));

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_provider_set_follows_export_and_withdraw() {
        let cluster = TestCluster::start(&["node-a", "node-b", "node-c"]).await;
        let a = cluster.node(0);
        export(&cluster, 1, "node-b");
        export(&cluster, 2, "node-c");
        assert_eq!(a.endpoints().find(ENDPOINT).unwrap().unwrap().providers.len(), 2);

        // node-b is the preferred provider until it withdraws
        cluster.node(1).endpoints().withdraw(ENDPOINT).unwrap();
        let value = a
            .remote_services()
            .call(ENDPOINT, "greet", vec![json!("node-a")])
            .await
            .unwrap();
        assert_eq!(value, json!("node-c greets node-a"));

        a.node_left(cluster.node(2).local_node().id());
        assert!(a.endpoints().find(ENDPOINT).unwrap().is_none());
        assert!(matches!(
            a.remote_services().call(ENDPOINT, "greet", vec![json!("x")]).await,
            Err(RemoteServiceError::EndpointNotFound(_))
        ));

        cluster.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_switched_off_handler_does_not_answer() {
        let cluster = TestCluster::start(&["node-a", "node-b"]).await;
        let a = cluster.node(0);
        export(&cluster, 1, "node-b");
        cluster.node(1).switches().turn_off("dosgi");

        let err = a
            .remote_services()
            .call(ENDPOINT, "greet", vec![json!("node-a")])
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteServiceError::NoResponse { .. }));

        cluster.shutdown().await;
    }
}
