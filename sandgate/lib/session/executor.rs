//! Tool invocation against a named sandbox.

use std::sync::Arc;

use serde_json::Value;

use crate::{activation::EndpointResolver, SandgateError, SandgateResult};

use super::{
    HttpSessionTransport, SessionCache, SessionHandle, SessionTransport, ToolDescriptor,
    ToolOutcome,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Runs tool operations against a sandbox by name.
///
/// Each operation resolves the sandbox to a live instance endpoint first and
/// then works through a cached session with that endpoint. Resolution and
/// session failures surface unchanged.
pub struct ToolExecutor<T: SessionTransport = HttpSessionTransport> {
    resolver: EndpointResolver,
    cache: SessionCache<T>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<T: SessionTransport> ToolExecutor<T> {
    /// Creates an executor resolving through the given resolver.
    pub fn new(resolver: EndpointResolver, cache: SessionCache<T>) -> Self {
        Self { resolver, cache }
    }

    /// Lists the tools the named sandbox exposes.
    pub async fn list_tools(&self, name: &str) -> SandgateResult<Vec<ToolDescriptor>> {
        let session = self.session(name).await?;
        session.list_tools().await
    }

    /// Invokes one tool inside the named sandbox.
    pub async fn call_tool(
        &self,
        name: &str,
        tool: &str,
        arguments: Value,
    ) -> SandgateResult<ToolOutcome> {
        if tool.trim().is_empty() {
            return Err(SandgateError::validation("tool name must not be empty"));
        }

        let session = self.session(name).await?;
        session.call_tool(tool, arguments).await
    }

    async fn session(&self, name: &str) -> SandgateResult<Arc<T::Session>> {
        let endpoint = self.resolver.resolve(name).await?;
        self.cache.acquire(&endpoint.origin()).await
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use serde_json::json;

    use crate::{
        backend::MemoryBackend, config::ResolverConfig, sandbox::Sandbox, store::WorkloadStore,
    };

    use super::*;

    #[derive(Default, Clone)]
    struct EchoTransport {
        inner: Arc<EchoInner>,
    }

    #[derive(Default)]
    struct EchoInner {
        connects: AtomicUsize,
        endpoints: Mutex<Vec<String>>,
    }

    struct EchoSession {
        endpoint: String,
    }

    #[async_trait]
    impl SessionTransport for EchoTransport {
        type Session = EchoSession;

        async fn connect(&self, endpoint: &str) -> SandgateResult<Self::Session> {
            self.inner.connects.fetch_add(1, Ordering::SeqCst);
            self.inner
                .endpoints
                .lock()
                .unwrap()
                .push(endpoint.to_string());

            Ok(EchoSession {
                endpoint: endpoint.to_string(),
            })
        }
    }

    #[async_trait]
    impl SessionHandle for EchoSession {
        async fn ping(&self) -> SandgateResult<()> {
            Ok(())
        }

        async fn list_tools(&self) -> SandgateResult<Vec<ToolDescriptor>> {
            Ok(vec![ToolDescriptor {
                name: "shell_exec".to_string(),
                description: "Run a shell command".to_string(),
                input_schema: Value::Null,
            }])
        }

        async fn call_tool(&self, tool: &str, arguments: Value) -> SandgateResult<ToolOutcome> {
            Ok(ToolOutcome {
                content: format!("{tool}@{}:{arguments}", self.endpoint),
                is_error: false,
            })
        }
    }

    async fn executor(names: &[&str]) -> anyhow::Result<(ToolExecutor<EchoTransport>, EchoTransport)> {
        let store = WorkloadStore::new(Arc::new(MemoryBackend::new()), "default".to_string());
        for name in names {
            let mut sandbox = Sandbox {
                name: name.to_string(),
                ..Default::default()
            };
            sandbox.normalize();
            store.create(&sandbox).await?;
        }

        let resolver = EndpointResolver::new(
            store,
            ResolverConfig {
                poll_interval: Duration::from_millis(20),
                timeout: Duration::from_millis(200),
                instance_port: 8080,
            },
        );

        let transport = EchoTransport::default();
        let executor = ToolExecutor::new(resolver, SessionCache::new(transport.clone()));

        Ok((executor, transport))
    }

    #[tokio::test]
    async fn test_call_tool_round_trips_and_reuses_session() -> anyhow::Result<()> {
        let (executor, transport) = executor(&["runner"]).await?;

        let outcome = executor
            .call_tool("runner", "shell_exec", json!({ "command": "ls" }))
            .await?;
        assert!(!outcome.is_error);
        assert!(outcome.content.starts_with("shell_exec@http://10.244."));
        assert!(outcome.content.contains(r#"{"command":"ls"}"#));

        executor.call_tool("runner", "shell_exec", Value::Null).await?;
        assert_eq!(transport.inner.connects.load(Ordering::SeqCst), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_list_tools_connects_to_instance_port() -> anyhow::Result<()> {
        let (executor, transport) = executor(&["lister"]).await?;

        let tools = executor.list_tools("lister").await?;
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "shell_exec");

        let endpoints = transport.inner.endpoints.lock().unwrap();
        assert_eq!(endpoints.len(), 1);
        assert!(endpoints[0].ends_with(":8080"));

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_sandbox_fails_resolution() -> anyhow::Result<()> {
        let (executor, transport) = executor(&[]).await?;

        let err = executor.list_tools("ghost").await.unwrap_err();
        assert!(matches!(err, SandgateError::ResolutionTimeout(_)));
        assert_eq!(transport.inner.connects.load(Ordering::SeqCst), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_tool_name_rejected_before_resolving() -> anyhow::Result<()> {
        let (executor, transport) = executor(&["strict"]).await?;

        let err = executor
            .call_tool("strict", "  ", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, SandgateError::Validation(_)));
        assert_eq!(transport.inner.connects.load(Ordering::SeqCst), 0);

        Ok(())
    }
}
