//! The orchestration backend boundary.

use async_trait::async_trait;

use crate::SandgateResult;

use super::{InstanceRecord, LabelSelector, WorkloadEvent, WorkloadManifest, WorkloadRecord};

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// Operations the gateway needs from an orchestration backend.
///
/// Reads come in two flavors with different consistency. `get_workload` is a
/// strong read against the backend's source of truth: `Ok(None)` is confirmed
/// absence, while a failed call means the read itself did not happen. The
/// `list_*` calls serve from the backend's cache and may lag the source of
/// truth in both directions, so callers that need freshness must poll.
#[async_trait]
pub trait ClusterBackend: Send + Sync {
    /// Submits a workload, its labels, and its annotations in one atomic call.
    ///
    /// A workload with the same name already present fails with
    /// `AlreadyExists`.
    async fn create_workload(&self, manifest: WorkloadManifest) -> SandgateResult<()>;

    /// Reads one workload from the source of truth.
    async fn get_workload(
        &self,
        namespace: &str,
        name: &str,
    ) -> SandgateResult<Option<WorkloadRecord>>;

    /// Lists workloads matching the selector from the backend cache.
    async fn list_workloads(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> SandgateResult<Vec<WorkloadRecord>>;

    /// Deletes a workload and its instances. Absent workloads fail with
    /// `NotFound`.
    async fn delete_workload(&self, namespace: &str, name: &str) -> SandgateResult<()>;

    /// Lists instances matching the selector from the backend cache.
    async fn list_instances(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> SandgateResult<Vec<InstanceRecord>>;

    /// Appends an activity event to the backend's event stream.
    async fn append_event(&self, namespace: &str, event: WorkloadEvent) -> SandgateResult<()>;

    /// Lists events addressed to the given object.
    async fn list_events(
        &self,
        namespace: &str,
        object_name: &str,
        object_kind: &str,
    ) -> SandgateResult<Vec<WorkloadEvent>>;
}
