//! Sandbox name to live instance endpoint resolution.

use std::net::SocketAddr;

use rand::seq::SliceRandom;
use tokio::time;

use crate::{
    backend::InstanceRecord, config::ResolverConfig, store::WorkloadStore, SandgateError,
    SandgateResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A live instance endpoint chosen for one activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    /// Name of the chosen instance.
    pub instance: String,

    /// Network authority of the instance, `host:port`.
    pub authority: String,
}

/// Maps a sandbox name to a currently reachable instance endpoint.
///
/// Instance discovery goes through the backend cache, which lags the
/// gateway's own writes. The resolver rides out that lag with a bounded
/// poll and picks uniformly at random among the instances that have an
/// address, on the well-known instance port. There is no health checking
/// beyond presence in the cache and no stickiness.
#[derive(Clone)]
pub struct EndpointResolver {
    store: WorkloadStore,
    config: ResolverConfig,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ResolvedEndpoint {
    /// Returns the HTTP origin serving this endpoint.
    pub fn origin(&self) -> String {
        format!("http://{}", self.authority)
    }
}

impl EndpointResolver {
    /// Creates a resolver reading instances from the given store.
    pub fn new(store: WorkloadStore, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    /// Resolves the named sandbox to one addressed instance.
    ///
    /// Polls the cached instance list until an instance with an address
    /// shows up or the window closes. At the deadline, instances that were
    /// observed but never addressed yield [`SandgateError::NotFound`]; a
    /// window with no instances at all yields
    /// [`SandgateError::ResolutionTimeout`].
    pub async fn resolve(&self, name: &str) -> SandgateResult<ResolvedEndpoint> {
        let deadline = time::Instant::now() + self.config.timeout;
        let mut observed_instances = false;

        loop {
            match self.store.instances(name).await {
                Ok(instances) => {
                    observed_instances |= !instances.is_empty();
                    if let Some(endpoint) = self.choose(&instances) {
                        tracing::debug!(
                            sandbox = %name,
                            instance = %endpoint.instance,
                            authority = %endpoint.authority,
                            "resolved endpoint"
                        );
                        return Ok(endpoint);
                    }
                }
                Err(e) => {
                    tracing::debug!(sandbox = %name, "instance discovery failed: {e}");
                }
            }

            if time::Instant::now() >= deadline {
                return Err(if observed_instances {
                    SandgateError::NotFound(format!("no addressed instance for sandbox {name}"))
                } else {
                    SandgateError::ResolutionTimeout(name.to_string())
                });
            }
            time::sleep(self.config.poll_interval).await;
        }
    }

    /// Picks one addressed instance uniformly at random.
    fn choose(&self, instances: &[InstanceRecord]) -> Option<ResolvedEndpoint> {
        let addressed: Vec<_> = instances
            .iter()
            .filter_map(|instance| instance.address.map(|address| (instance, address)))
            .collect();

        let (instance, address) = addressed.choose(&mut rand::thread_rng())?;
        let authority = SocketAddr::new(*address, self.config.instance_port).to_string();

        Some(ResolvedEndpoint {
            instance: instance.name.clone(),
            authority,
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
