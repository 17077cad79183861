//! Sandbox creation, readiness gating, and deletion.

use tokio::time;

use crate::{
    backend::InstanceRecord,
    config::LifecycleConfig,
    sandbox::Sandbox,
    store::WorkloadStore,
    SandgateError, SandgateResult,
};

use super::NameLocks;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Drives the sandbox lifecycle against the workload store.
pub struct SandboxController {
    store: WorkloadStore,
    config: LifecycleConfig,
    locks: NameLocks,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl SandboxController {
    /// Creates a controller over the given store.
    pub fn new(store: WorkloadStore, config: LifecycleConfig) -> Self {
        Self {
            store,
            config,
            locks: NameLocks::new(),
        }
    }

    /// Returns the store this controller drives.
    pub fn store(&self) -> &WorkloadStore {
        &self.store
    }

    /// Creates a sandbox and waits for it to become ready.
    ///
    /// The spec is normalized, checked against the source of truth for a
    /// duplicate, submitted, and then observed until every desired instance
    /// reports ready. Mutations of one name serialize on a per-name lock, so
    /// concurrent creates of the same name see each other.
    ///
    /// On readiness timeout the workload is left in place; callers can
    /// inspect or delete it. A failed duplicate check aborts the creation
    /// rather than creating blind.
    pub async fn create(&self, mut sandbox: Sandbox) -> SandgateResult<Sandbox> {
        sandbox.normalize();
        sandbox.validate()?;

        let _guard = self.locks.acquire(&sandbox.name).await;

        if self.store.get_record(&sandbox.name).await?.is_some() {
            return Err(SandgateError::AlreadyExists(sandbox.name));
        }

        self.store.create(&sandbox).await?;
        tracing::info!(sandbox = %sandbox.name, "workload submitted, waiting for readiness");

        self.wait_ready(&sandbox.name).await?;
        tracing::info!(sandbox = %sandbox.name, "sandbox is ready");

        Ok(sandbox)
    }

    /// Reads one sandbox spec from the source of truth.
    pub async fn get(&self, name: &str) -> SandgateResult<Option<Sandbox>> {
        self.store.get(name).await
    }

    /// Lists owned sandboxes from the backend cache.
    pub async fn list(&self) -> SandgateResult<Vec<Sandbox>> {
        self.store.list().await
    }

    /// Lists a sandbox's instances from the backend cache.
    pub async fn instances(&self, name: &str) -> SandgateResult<Vec<InstanceRecord>> {
        self.store.instances(name).await
    }

    /// Deletes a sandbox under its name lock.
    pub async fn delete(&self, name: &str) -> SandgateResult<()> {
        let _guard = self.locks.acquire(name).await;

        self.store.delete(name).await?;
        tracing::info!(sandbox = %name, "sandbox deleted");

        Ok(())
    }

    /// Polls the source of truth until every desired instance is ready.
    ///
    /// Each tick is an independent observation: a transient read failure or
    /// a workload that is momentarily missing does not abort the wait, only
    /// the deadline does.
    async fn wait_ready(&self, name: &str) -> SandgateResult<()> {
        let deadline = time::Instant::now() + self.config.timeout;

        loop {
            match self.store.get_record(name).await {
                Ok(Some(record)) if record.is_ready() => return Ok(()),
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(sandbox = %name, "readiness observation failed: {e}")
                }
            }

            if time::Instant::now() >= deadline {
                return Err(SandgateError::ReadinessTimeout(name.to_string()));
            }
            time::sleep(self.config.poll_interval).await;
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use crate::{
        backend::{MemoryBackend, MemoryBackendConfig},
        sandbox::SandboxStatus,
    };

    use super::*;

    fn quick_config() -> LifecycleConfig {
        LifecycleConfig {
            poll_interval: Duration::from_millis(20),
            timeout: Duration::from_millis(500),
        }
    }

    fn controller_with(backend: Arc<MemoryBackend>, config: LifecycleConfig) -> SandboxController {
        let store = WorkloadStore::new(backend, "default".to_string());
        SandboxController::new(store, config)
    }

    fn spec(name: &str) -> Sandbox {
        Sandbox {
            name: name.to_string(),
            kind: "python".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_and_round_trips() -> anyhow::Result<()> {
        let controller = controller_with(Arc::new(MemoryBackend::new()), quick_config());

        let mut requested = spec("norm");
        requested.timeout = 2000;
        requested.idle_timeout = 120;

        let created = controller.create(requested).await?;

        assert_eq!(created.timeout, 1440);
        assert_eq!(created.idle_timeout, 60);
        assert_eq!(created.image, "python:3.9-slim");
        assert_eq!(created.status, Some(SandboxStatus::Creating));

        let fetched = controller.get("norm").await?;
        assert_eq!(fetched, Some(created));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name() -> anyhow::Result<()> {
        let controller = controller_with(Arc::new(MemoryBackend::new()), quick_config());

        controller.create(spec("twice")).await?;
        let err = controller.create(spec("twice")).await.unwrap_err();

        assert!(matches!(err, SandgateError::AlreadyExists(name) if name == "twice"));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_waits_for_gradual_readiness() -> anyhow::Result<()> {
        let backend = Arc::new(MemoryBackend::with_config(MemoryBackendConfig {
            instance_startup: Duration::from_millis(80),
            ..Default::default()
        }));
        let controller = controller_with(backend, quick_config());

        let started = std::time::Instant::now();
        controller.create(spec("slow")).await?;

        assert!(
            started.elapsed() >= Duration::from_millis(80),
            "create should return only after instances become ready"
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_readiness_timeout_leaves_workload_in_place() -> anyhow::Result<()> {
        let backend = Arc::new(MemoryBackend::with_config(MemoryBackendConfig {
            materialize: false,
            ..Default::default()
        }));
        let controller = controller_with(
            backend,
            LifecycleConfig {
                poll_interval: Duration::from_millis(20),
                timeout: Duration::from_millis(120),
            },
        );

        let err = controller.create(spec("stuck")).await.unwrap_err();
        assert!(matches!(err, SandgateError::ReadinessTimeout(name) if name == "stuck"));

        let leftover = controller.get("stuck").await?;
        assert!(leftover.is_some(), "no rollback on readiness timeout");

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_duplicate_check_aborts_create() -> anyhow::Result<()> {
        let backend = Arc::new(MemoryBackend::new());
        let controller = controller_with(backend.clone(), quick_config());

        backend.fail_strong_reads(true);
        let err = controller.create(spec("blind")).await.unwrap_err();
        assert!(matches!(err, SandgateError::Backend(_)));

        backend.fail_strong_reads(false);
        assert!(controller.get("blind").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_creates_one_winner() -> anyhow::Result<()> {
        let controller = Arc::new(controller_with(Arc::new(MemoryBackend::new()), quick_config()));

        let a = tokio::spawn({
            let controller = controller.clone();
            async move { controller.create(spec("race")).await }
        });
        let b = tokio::spawn({
            let controller = controller.clone();
            async move { controller.create(spec("race")).await }
        });

        let (a, b) = (a.await?, b.await?);
        let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
        let rejected = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(SandgateError::AlreadyExists(_))))
            .count();

        assert_eq!(winners, 1);
        assert_eq!(rejected, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let controller = controller_with(Arc::new(MemoryBackend::new()), quick_config());

        let err = controller.delete("ghost").await.unwrap_err();
        assert!(matches!(err, SandgateError::NotFound(_)));
    }
}
