//! Shared state handed to every request handler.

use std::sync::Arc;

use crate::{
    activation::ActivationRouter, config::EnvironmentCatalog, lifecycle::SandboxController,
    session::ToolExecutor,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Shared server state behind the HTTP surface.
///
/// Everything here is `Arc`-shared so the state clones cheaply into each
/// handler invocation.
#[derive(Clone)]
pub struct ServerState {
    controller: Arc<SandboxController>,
    router: Arc<ActivationRouter>,
    executor: Arc<ToolExecutor>,
    environments: Arc<EnvironmentCatalog>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ServerState {
    /// Bundles the gateway components into one handler state.
    pub fn new(
        controller: Arc<SandboxController>,
        router: Arc<ActivationRouter>,
        executor: Arc<ToolExecutor>,
        environments: Arc<EnvironmentCatalog>,
    ) -> Self {
        Self {
            controller,
            router,
            executor,
            environments,
        }
    }

    /// The sandbox lifecycle controller.
    pub fn controller(&self) -> &SandboxController {
        &self.controller
    }

    /// The activation router.
    pub fn router(&self) -> &ActivationRouter {
        &self.router
    }

    /// The tool executor.
    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    /// The configured environment catalog.
    pub fn environments(&self) -> &EnvironmentCatalog {
        &self.environments
    }
}
