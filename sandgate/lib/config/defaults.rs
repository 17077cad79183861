//! Default values and wire constants used throughout the crate.

use std::time::Duration;

//--------------------------------------------------------------------------------------------------
// Constants: Server
//--------------------------------------------------------------------------------------------------

/// The default address the gateway server listens on.
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:10000";

/// The default backend namespace sandboxes are provisioned into.
pub const DEFAULT_NAMESPACE: &str = "default";

//--------------------------------------------------------------------------------------------------
// Constants: Workload wire format
//--------------------------------------------------------------------------------------------------

/// Label key marking workloads owned by this gateway.
pub const OWNER_LABEL: &str = "owner";

/// Label value marking workloads owned by this gateway.
pub const OWNER_LABEL_VALUE: &str = "agent-sandbox";

/// Label key carrying the sandbox name on workloads and instances.
pub const SANDBOX_LABEL: &str = "sandbox";

/// Annotation key holding the serialized sandbox spec.
pub const SPEC_ANNOTATION: &str = "sandbox-data";

/// Object kind activity events are addressed to.
pub const WORKLOAD_KIND: &str = "Workload";

/// Environment variable injected into each instance with its own name.
pub const INSTANCE_NAME_ENV: &str = "INSTANCE_NAME";

/// Component name stamped on activity events.
pub const ACTIVATOR_COMPONENT: &str = "sandgate-activator";

/// Event reason recording the last observed request.
pub const LAST_REQUEST_REASON: &str = "LastRequestTime";

/// Event reason recording the last observed response.
pub const LAST_RESPONSE_REASON: &str = "LastResponseTime";

/// Correlation header injected into proxied requests.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Session identifier header used by the streamable HTTP transport.
pub const MCP_SESSION_HEADER: &str = "Mcp-Session-Id";

//--------------------------------------------------------------------------------------------------
// Constants: Sandbox defaults
//--------------------------------------------------------------------------------------------------

/// Default sandbox lifetime in minutes.
pub const DEFAULT_TIMEOUT_MINUTES: u32 = 60;

/// Default idle window in minutes.
pub const DEFAULT_IDLE_TIMEOUT_MINUTES: u32 = 10;

/// Upper bound on sandbox lifetime in minutes.
pub const MAX_TIMEOUT_MINUTES: u32 = 1440;

/// Upper bound on the idle window in minutes.
pub const MAX_IDLE_TIMEOUT_MINUTES: u32 = 60;

/// Default CPU request quantity.
pub const DEFAULT_CPU_REQUEST: &str = "100m";

/// Default memory request quantity.
pub const DEFAULT_MEMORY_REQUEST: &str = "128Mi";

/// Default CPU limit quantity.
pub const DEFAULT_CPU_LIMIT: &str = "1000m";

/// Default memory limit quantity.
pub const DEFAULT_MEMORY_LIMIT: &str = "1024Mi";

/// Image used for `python` sandboxes.
pub const PYTHON_IMAGE: &str = "python:3.9-slim";

/// Image used for `shell` sandboxes.
pub const SHELL_IMAGE: &str = "alpine:latest";

/// Image used for `node` sandboxes.
pub const NODE_IMAGE: &str = "node:16-alpine";

/// Image used for `aio` (all-in-one) sandboxes.
pub const DEFAULT_AIO_IMAGE: &str = "ghcr.io/agent-infra/sandbox:latest";

/// Image used for `aiocn` sandboxes served from the CN region registry.
pub const DEFAULT_AIO_CN_IMAGE: &str =
    "enterprise-public-cn-beijing.cr.volces.com/vefaas-public/all-in-one-sandbox:latest";

/// Image used when no type matches.
pub const FALLBACK_IMAGE: &str = "nginx:latest";

//--------------------------------------------------------------------------------------------------
// Constants: Timing
//--------------------------------------------------------------------------------------------------

/// Interval between readiness observations during creation.
pub const DEFAULT_READINESS_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Total window a new sandbox has to become ready.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Interval between instance-list observations during endpoint resolution.
pub const DEFAULT_RESOLVE_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Total window endpoint resolution may wait for an instance.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Well-known port instances serve traffic on.
pub const DEFAULT_INSTANCE_PORT: u16 = 8080;

/// Interval between idle-policy evaluation passes.
pub const DEFAULT_SCALE_INTERVAL: Duration = Duration::from_secs(60);

//--------------------------------------------------------------------------------------------------
// Constants: Tool sessions
//--------------------------------------------------------------------------------------------------

/// Protocol revision the tool-session client speaks.
pub const MCP_PROTOCOL_VERSION: &str = "2025-03-26";

/// Client name announced during the session handshake.
pub const SESSION_CLIENT_NAME: &str = "sandgate-mcp-client";

/// Client version announced during the session handshake.
pub const SESSION_CLIENT_VERSION: &str = "1.0.0";

/// Per-request timeout on tool-session HTTP calls.
pub const DEFAULT_SESSION_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

//--------------------------------------------------------------------------------------------------
// Constants: Proxy transport
//--------------------------------------------------------------------------------------------------

/// Upstream TCP connect timeout.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Upstream TCP keepalive interval.
pub const DEFAULT_TCP_KEEPALIVE: Duration = Duration::from_secs(30);

/// How long to wait for upstream response headers.
pub const DEFAULT_RESPONSE_HEADER_TIMEOUT: Duration = Duration::from_secs(300);

/// How long idle upstream connections stay pooled.
pub const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Idle upstream connections kept per host.
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 20;

/// Pending activations allowed per sandbox before shedding load.
pub const DEFAULT_WAIT_QUEUE_DEPTH: usize = 32;
