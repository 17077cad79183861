//! Gateway configuration types.

use std::{path::PathBuf, time::Duration};

use getset::Getters;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::defaults::{
    DEFAULT_DIAL_TIMEOUT, DEFAULT_INSTANCE_PORT, DEFAULT_NAMESPACE, DEFAULT_POOL_IDLE_TIMEOUT,
    DEFAULT_POOL_MAX_IDLE_PER_HOST, DEFAULT_READINESS_POLL_INTERVAL, DEFAULT_READINESS_TIMEOUT,
    DEFAULT_RESOLVE_POLL_INTERVAL, DEFAULT_RESOLVE_TIMEOUT, DEFAULT_RESPONSE_HEADER_TIMEOUT,
    DEFAULT_SERVER_ADDR, DEFAULT_TCP_KEEPALIVE, DEFAULT_WAIT_QUEUE_DEPTH,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Top-level configuration for the gateway process.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct GatewayConfig {
    /// Address the REST server binds to.
    #[builder(default = DEFAULT_SERVER_ADDR.to_string())]
    server_addr: String,

    /// Backend namespace sandboxes are provisioned into.
    #[builder(default = DEFAULT_NAMESPACE.to_string())]
    namespace: String,

    /// Optional path to an environment catalog file.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default)]
    environments_file: Option<PathBuf>,

    /// Timing applied to sandbox creation.
    #[builder(default)]
    lifecycle: LifecycleConfig,

    /// Timing applied to endpoint resolution.
    #[builder(default)]
    resolver: ResolverConfig,

    /// Upstream proxy transport tuning.
    #[builder(default)]
    proxy: ProxyConfig,

    /// Pending activations allowed per sandbox.
    #[builder(default = DEFAULT_WAIT_QUEUE_DEPTH)]
    queue_depth: usize,
}

/// Timing applied to sandbox creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Interval between readiness observations.
    pub poll_interval: Duration,

    /// Total window a new sandbox has to become ready.
    pub timeout: Duration,
}

/// Timing applied to endpoint resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Interval between instance-list observations.
    pub poll_interval: Duration,

    /// Total window resolution may wait for an addressed instance.
    pub timeout: Duration,

    /// Port instances serve traffic on.
    pub instance_port: u16,
}

/// Upstream proxy transport tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Upstream TCP connect timeout.
    pub dial_timeout: Duration,

    /// Upstream TCP keepalive interval.
    pub tcp_keepalive: Duration,

    /// How long to wait for upstream response headers.
    pub response_header_timeout: Duration,

    /// How long idle upstream connections stay pooled.
    pub pool_idle_timeout: Duration,

    /// Idle upstream connections kept per host.
    pub pool_max_idle_per_host: usize,
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_READINESS_POLL_INTERVAL,
            timeout: DEFAULT_READINESS_TIMEOUT,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_RESOLVE_POLL_INTERVAL,
            timeout: DEFAULT_RESOLVE_TIMEOUT,
            instance_port: DEFAULT_INSTANCE_PORT,
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            tcp_keepalive: DEFAULT_TCP_KEEPALIVE,
            response_header_timeout: DEFAULT_RESPONSE_HEADER_TIMEOUT,
            pool_idle_timeout: DEFAULT_POOL_IDLE_TIMEOUT,
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
