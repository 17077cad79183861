//! `sandgate` is a gateway service that provisions sandboxed agent workloads on an
//! orchestration backend and routes traffic to them on demand.
//!
//! # Overview
//!
//! sandgate sits between agent frameworks and a cluster backend. It handles:
//! - Sandbox lifecycle management (create, inspect, delete)
//! - Readiness gating on newly provisioned workloads
//! - On-demand endpoint resolution and request routing
//! - Activity tracking for idle detection
//! - Cached tool sessions against running instances
//!
//! # Architecture
//!
//! sandgate consists of several key components:
//!
//! - **Backend**: A trait boundary over the orchestration backend, with an
//!   in-process implementation for local use and tests
//! - **Store**: Workload manifest rendering and spec persistence
//! - **Lifecycle**: Creation flow with duplicate detection and readiness polling
//! - **Activation**: Endpoint resolution, activity events, and the reverse proxy
//! - **Session**: Cached tool sessions speaking streamable HTTP
//! - **Server**: REST API and the activation routes
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use sandgate::{
//!     backend::MemoryBackend,
//!     config::GatewayConfig,
//!     lifecycle::SandboxController,
//!     sandbox::Sandbox,
//!     store::WorkloadStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = GatewayConfig::builder().build();
//!     let backend = Arc::new(MemoryBackend::new());
//!     let store = WorkloadStore::new(backend, config.get_namespace().clone());
//!     let controller = SandboxController::new(store, Default::default());
//!
//!     let mut spec = Sandbox::default();
//!     spec.name = "demo".to_string();
//!     spec.kind = "python".to_string();
//!     let created = controller.create(spec).await?;
//!     println!("sandbox {} is ready", created.name);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`activation`] - Endpoint resolution, activity tracking, and routing
//! - [`backend`] - Orchestration backend boundary and the in-memory backend
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration types and defaults
//! - [`lifecycle`] - Sandbox creation, readiness, and deletion
//! - [`sandbox`] - The sandbox spec type and normalization
//! - [`scaler`] - Idle-policy evaluation hook
//! - [`server`] - REST API server implementation
//! - [`session`] - Tool sessions and the session cache
//! - [`store`] - Workload manifest rendering and persistence

#![warn(missing_docs)]

mod error;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod activation;
pub mod backend;
pub mod cli;
pub mod config;
pub mod lifecycle;
pub mod sandbox;
pub mod scaler;
pub mod server;
pub mod session;
pub mod store;

pub use error::*;
