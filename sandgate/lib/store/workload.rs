//! Workload manifest rendering and sandbox spec persistence.

use std::{collections::BTreeMap, sync::Arc};

use crate::{
    backend::{
        ClusterBackend, EnvValue, EnvVar, InstanceRecord, LabelSelector, ResourceQuantities,
        ResourceRequirements, WorkloadManifest, WorkloadRecord,
    },
    config::{INSTANCE_NAME_ENV, OWNER_LABEL, OWNER_LABEL_VALUE, SANDBOX_LABEL, SPEC_ANNOTATION},
    sandbox::Sandbox,
    SandgateError, SandgateResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Persists sandbox specs as workloads on the orchestration backend.
///
/// The serialized spec rides along as a workload annotation, so the backend
/// doubles as the spec store and no separate database is involved. The
/// annotation is written together with the workload in one submission and is
/// never mutated afterwards.
#[derive(Clone)]
pub struct WorkloadStore {
    backend: Arc<dyn ClusterBackend>,
    namespace: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl WorkloadStore {
    /// Creates a store provisioning into the given namespace.
    pub fn new(backend: Arc<dyn ClusterBackend>, namespace: String) -> Self {
        Self { backend, namespace }
    }

    /// Returns the namespace this store provisions into.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the backend this store talks to.
    pub fn backend(&self) -> &Arc<dyn ClusterBackend> {
        &self.backend
    }

    /// Renders the workload manifest for a normalized spec.
    ///
    /// The manifest pins one replica, carries the ownership and selector
    /// labels on workload and instances, injects the per-instance identity
    /// variable, and embeds the full serialized spec as an annotation.
    pub fn render_manifest(&self, sandbox: &Sandbox) -> SandgateResult<WorkloadManifest> {
        sandbox.validate()?;

        let spec_json = serde_json::to_string(sandbox).map_err(|e| {
            SandgateError::validation(format!("cannot serialize sandbox spec: {e}"))
        })?;

        let mut labels = BTreeMap::new();
        labels.insert(OWNER_LABEL.to_string(), OWNER_LABEL_VALUE.to_string());
        labels.insert(SANDBOX_LABEL.to_string(), sandbox.name.clone());

        let mut annotations = BTreeMap::new();
        annotations.insert(SPEC_ANNOTATION.to_string(), spec_json);

        let mut env = vec![EnvVar {
            name: INSTANCE_NAME_ENV.to_string(),
            value: EnvValue::InstanceName,
        }];
        env.extend(sandbox.env.iter().map(|(name, value)| EnvVar {
            name: name.clone(),
            value: EnvValue::Literal(value.clone()),
        }));

        Ok(WorkloadManifest {
            name: sandbox.name.clone(),
            namespace: self.namespace.clone(),
            labels,
            annotations,
            replicas: 1,
            image: sandbox.image.clone(),
            args: sandbox.args.clone(),
            workdir: sandbox.workdir.clone(),
            env,
            resources: ResourceRequirements {
                requests: ResourceQuantities {
                    cpu: sandbox.cpu.clone(),
                    memory: sandbox.memory.clone(),
                },
                limits: ResourceQuantities {
                    cpu: sandbox.cpu_limit.clone(),
                    memory: sandbox.memory_limit.clone(),
                },
            },
            ports: sandbox.ports.clone(),
        })
    }

    /// Renders the manifest for a spec and submits it in one backend call.
    pub async fn create(&self, sandbox: &Sandbox) -> SandgateResult<()> {
        let manifest = self.render_manifest(sandbox)?;
        self.backend.create_workload(manifest).await
    }

    /// Reads one sandbox spec from the source of truth.
    ///
    /// `Ok(None)` is confirmed absence. A workload that exists but carries a
    /// missing or corrupt spec annotation is reported as a backend error, it
    /// is not one of ours to interpret.
    pub async fn get(&self, name: &str) -> SandgateResult<Option<Sandbox>> {
        let Some(record) = self.backend.get_workload(&self.namespace, name).await? else {
            return Ok(None);
        };

        decode_record(&record).map(Some)
    }

    /// Reads one workload record from the source of truth, for readiness
    /// observation.
    pub async fn get_record(&self, name: &str) -> SandgateResult<Option<WorkloadRecord>> {
        self.backend.get_workload(&self.namespace, name).await
    }

    /// Reads one workload record from the backend cache by its selector
    /// label. Cheaper than a strong read and may lag it.
    pub async fn cached_record(&self, name: &str) -> SandgateResult<Option<WorkloadRecord>> {
        let selector = LabelSelector::new().with(SANDBOX_LABEL, name);
        let records = self
            .backend
            .list_workloads(&self.namespace, &selector)
            .await?;

        Ok(records.into_iter().next())
    }

    /// Lists sandbox specs owned by this gateway from the backend cache.
    ///
    /// The listing may lag recent creations and deletions. Records with
    /// unreadable annotations are skipped rather than failing the listing.
    pub async fn list(&self) -> SandgateResult<Vec<Sandbox>> {
        let selector = LabelSelector::new().with(OWNER_LABEL, OWNER_LABEL_VALUE);
        let records = self
            .backend
            .list_workloads(&self.namespace, &selector)
            .await?;

        let mut sandboxes = Vec::with_capacity(records.len());
        for record in &records {
            match decode_record(record) {
                Ok(sandbox) => sandboxes.push(sandbox),
                Err(e) => {
                    tracing::warn!(
                        workload = %record.manifest.name,
                        "skipping workload with unreadable spec annotation: {e}"
                    );
                }
            }
        }

        Ok(sandboxes)
    }

    /// Deletes the sandbox workload and its instances.
    pub async fn delete(&self, name: &str) -> SandgateResult<()> {
        self.backend.delete_workload(&self.namespace, name).await
    }

    /// Lists the sandbox's instances from the backend cache.
    pub async fn instances(&self, name: &str) -> SandgateResult<Vec<InstanceRecord>> {
        let selector = LabelSelector::new().with(SANDBOX_LABEL, name);
        self.backend.list_instances(&self.namespace, &selector).await
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn decode_record(record: &WorkloadRecord) -> SandgateResult<Sandbox> {
    let raw = record
        .manifest
        .annotations
        .get(SPEC_ANNOTATION)
        .ok_or_else(|| {
            SandgateError::backend(format!(
                "workload {} has no spec annotation",
                record.manifest.name
            ))
        })?;

    serde_json::from_str(raw).map_err(|e| {
        SandgateError::backend(format!(
            "workload {} spec annotation is unreadable: {e}",
            record.manifest.name
        ))
    })
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
