//! Endpoint-keyed cache of live tool sessions.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::SandgateResult;

use super::{ToolDescriptor, ToolOutcome, ToolSession};

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// Opens tool sessions against instance endpoints.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// The session type this transport produces.
    type Session: SessionHandle;

    /// Connects and handshakes a fresh session with the endpoint.
    async fn connect(&self, endpoint: &str) -> SandgateResult<Self::Session>;
}

/// One established tool session.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// Verifies the session is still usable.
    async fn ping(&self) -> SandgateResult<()>;

    /// Lists the tools reachable through this session.
    async fn list_tools(&self) -> SandgateResult<Vec<ToolDescriptor>>;

    /// Invokes one tool through this session.
    async fn call_tool(&self, tool: &str, arguments: Value) -> SandgateResult<ToolOutcome>;
}

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Transport that opens real HTTP tool sessions.
#[derive(Debug, Default, Clone)]
pub struct HttpSessionTransport;

/// Caches one live session per endpoint and revalidates on every acquire.
///
/// A cached session is pinged before reuse. A session that fails its ping is
/// dropped and replaced with exactly one fresh connection; if that connection
/// fails too the error reaches the caller. Concurrent acquires for the same
/// endpoint may race, in which case the last finished connection stays cached.
pub struct SessionCache<T: SessionTransport = HttpSessionTransport> {
    transport: T,
    sessions: DashMap<String, Arc<T::Session>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<T: SessionTransport> SessionCache<T> {
    /// Creates an empty cache over the given transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            sessions: DashMap::new(),
        }
    }

    /// Returns a validated session for the endpoint, reusing the cached one
    /// when it still answers pings.
    pub async fn acquire(&self, endpoint: &str) -> SandgateResult<Arc<T::Session>> {
        let cached = self
            .sessions
            .get(endpoint)
            .map(|entry| entry.value().clone());

        if let Some(session) = cached {
            match session.ping().await {
                Ok(()) => return Ok(session),
                Err(e) => {
                    tracing::debug!(endpoint, error = %e, "cached tool session went stale");
                    self.sessions.remove(endpoint);
                }
            }
        }

        let session = Arc::new(self.transport.connect(endpoint).await?);
        self.sessions.insert(endpoint.to_string(), session.clone());

        Ok(session)
    }

    /// Drops the cached session for the endpoint, if any.
    pub fn evict(&self, endpoint: &str) {
        self.sessions.remove(endpoint);
    }
}

impl<T: SessionTransport + Default> Default for SessionCache<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl SessionTransport for HttpSessionTransport {
    type Session = ToolSession;

    async fn connect(&self, endpoint: &str) -> SandgateResult<Self::Session> {
        ToolSession::connect(endpoint).await
    }
}

#[async_trait]
impl SessionHandle for ToolSession {
    async fn ping(&self) -> SandgateResult<()> {
        ToolSession::ping(self).await
    }

    async fn list_tools(&self) -> SandgateResult<Vec<ToolDescriptor>> {
        ToolSession::list_tools(self).await
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> SandgateResult<ToolOutcome> {
        ToolSession::call_tool(self, tool, arguments).await
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
