//! An in-process backend that models a small cluster.

use std::{
    net::{IpAddr, Ipv4Addr},
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Mutex,
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};

use crate::{SandgateError, SandgateResult};

use super::{
    ClusterBackend, InstanceRecord, LabelSelector, WorkloadEvent, WorkloadManifest, WorkloadRecord,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Tuning for the simulated cluster behavior.
#[derive(Debug, Clone, Copy)]
pub struct MemoryBackendConfig {
    /// How long creations and deletions take to reach cached reads.
    pub cache_lag: Duration,

    /// How long instances take to start and acquire an address.
    pub instance_startup: Duration,

    /// Whether instances start at all. Disabled, workloads never become
    /// ready and instances never acquire addresses.
    pub materialize: bool,

    /// Fixed address assigned to every instance instead of the synthetic
    /// allocator. Lets instances point at a real local listener.
    pub instance_address: Option<IpAddr>,
}

/// An in-process [`ClusterBackend`] that models a small cluster, including
/// the cache lag and gradual instance startup of a real one.
///
/// Strong reads observe writes immediately; cached reads observe them after
/// the configured lag. Deleted objects linger in cached reads for the same
/// lag. Instances appear in cached reads without an address first and
/// acquire one once their startup delay elapses.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    config: MemoryBackendConfig,
    workloads: DashMap<String, StoredWorkload>,
    tombstones: DashMap<String, Tombstone>,
    events: Mutex<Vec<(String, WorkloadEvent)>>,
    instance_seq: AtomicU32,
    failures: FailureFlags,
}

#[derive(Debug, Clone)]
struct StoredWorkload {
    manifest: WorkloadManifest,
    instances: Vec<StoredInstance>,
    created_at: DateTime<Utc>,
    created_mono: Instant,
}

#[derive(Debug, Clone)]
struct StoredInstance {
    name: String,
    address: IpAddr,
}

#[derive(Debug, Clone)]
struct Tombstone {
    workload: StoredWorkload,
    deleted_mono: Instant,
}

#[derive(Debug, Default)]
struct FailureFlags {
    strong_reads: AtomicBool,
    workload_lists: AtomicBool,
    instance_lists: AtomicBool,
    event_appends: AtomicBool,
    event_lists: AtomicBool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MemoryBackend {
    /// Creates a backend with instant cache propagation and instant startup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend with the given simulated timing.
    pub fn with_config(config: MemoryBackendConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Makes strong workload reads fail until cleared. Failure-injection hook.
    pub fn fail_strong_reads(&self, fail: bool) {
        self.failures.strong_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes cached workload lists fail until cleared. Failure-injection hook.
    pub fn fail_workload_lists(&self, fail: bool) {
        self.failures.workload_lists.store(fail, Ordering::SeqCst);
    }

    /// Makes cached instance lists fail until cleared. Failure-injection hook.
    pub fn fail_instance_lists(&self, fail: bool) {
        self.failures.instance_lists.store(fail, Ordering::SeqCst);
    }

    /// Makes event appends fail until cleared. Failure-injection hook.
    pub fn fail_event_appends(&self, fail: bool) {
        self.failures.event_appends.store(fail, Ordering::SeqCst);
    }

    /// Makes event lists fail until cleared. Failure-injection hook.
    pub fn fail_event_lists(&self, fail: bool) {
        self.failures.event_lists.store(fail, Ordering::SeqCst);
    }

    fn key(namespace: &str, name: &str) -> String {
        format!("{namespace}/{name}")
    }

    fn address_for(seq: u32) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 244, (seq >> 8) as u8, (seq & 0xff) as u8))
    }

    fn started(&self, workload: &StoredWorkload, now: Instant) -> bool {
        self.config.materialize
            && now.duration_since(workload.created_mono) >= self.config.instance_startup
    }

    fn cache_visible(&self, workload: &StoredWorkload, now: Instant) -> bool {
        now.duration_since(workload.created_mono) >= self.config.cache_lag
    }

    fn workload_record(&self, workload: &StoredWorkload, now: Instant) -> WorkloadRecord {
        let desired = workload.manifest.replicas;
        let ready = if self.started(workload, now) { desired } else { 0 };

        WorkloadRecord {
            manifest: workload.manifest.clone(),
            desired_replicas: desired,
            ready_replicas: ready,
            created_at: workload.created_at,
        }
    }

    fn instance_records(&self, workload: &StoredWorkload, now: Instant) -> Vec<InstanceRecord> {
        let started = self.started(workload, now);

        workload
            .instances
            .iter()
            .map(|instance| InstanceRecord {
                name: instance.name.clone(),
                labels: workload.manifest.labels.clone(),
                address: started.then_some(instance.address),
                ready: started,
            })
            .collect()
    }

    /// Drops tombstones that have aged out of the cached view.
    fn prune_tombstones(&self, now: Instant) {
        self.tombstones
            .retain(|_, tombstone| now.duration_since(tombstone.deleted_mono) < self.config.cache_lag);
    }

    /// Collects the cached view of workloads in a namespace: live objects past
    /// the propagation lag plus recently deleted ones still lingering.
    fn cached_workloads(&self, namespace: &str, now: Instant) -> Vec<StoredWorkload> {
        self.prune_tombstones(now);

        let mut view: Vec<StoredWorkload> = self
            .workloads
            .iter()
            .filter(|entry| entry.manifest.namespace == namespace)
            .filter(|entry| self.cache_visible(entry.value(), now))
            .map(|entry| entry.value().clone())
            .collect();

        view.extend(
            self.tombstones
                .iter()
                .filter(|entry| entry.workload.manifest.namespace == namespace)
                .map(|entry| entry.workload.clone()),
        );

        view
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for MemoryBackendConfig {
    fn default() -> Self {
        Self {
            cache_lag: Duration::ZERO,
            instance_startup: Duration::ZERO,
            materialize: true,
            instance_address: None,
        }
    }
}

#[async_trait]
impl ClusterBackend for MemoryBackend {
    async fn create_workload(&self, manifest: WorkloadManifest) -> SandgateResult<()> {
        let key = Self::key(&manifest.namespace, &manifest.name);
        let name = manifest.name.clone();

        let instances = (0..manifest.replicas)
            .map(|_| {
                let seq = self.instance_seq.fetch_add(1, Ordering::SeqCst) + 1;
                StoredInstance {
                    name: format!("{name}-{seq:05x}"),
                    address: self
                        .config
                        .instance_address
                        .unwrap_or_else(|| Self::address_for(seq)),
                }
            })
            .collect();

        let stored = StoredWorkload {
            manifest,
            instances,
            created_at: Utc::now(),
            created_mono: Instant::now(),
        };

        match self.workloads.entry(key) {
            Entry::Occupied(_) => Err(SandgateError::AlreadyExists(name)),
            Entry::Vacant(entry) => {
                entry.insert(stored);
                Ok(())
            }
        }
    }

    async fn get_workload(
        &self,
        namespace: &str,
        name: &str,
    ) -> SandgateResult<Option<WorkloadRecord>> {
        if self.failures.strong_reads.load(Ordering::SeqCst) {
            return Err(SandgateError::backend("injected strong read failure"));
        }

        let now = Instant::now();
        Ok(self
            .workloads
            .get(&Self::key(namespace, name))
            .map(|entry| self.workload_record(entry.value(), now)))
    }

    async fn list_workloads(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> SandgateResult<Vec<WorkloadRecord>> {
        if self.failures.workload_lists.load(Ordering::SeqCst) {
            return Err(SandgateError::backend("injected workload list failure"));
        }

        let now = Instant::now();
        Ok(self
            .cached_workloads(namespace, now)
            .iter()
            .filter(|workload| selector.matches(&workload.manifest.labels))
            .map(|workload| self.workload_record(workload, now))
            .collect())
    }

    async fn delete_workload(&self, namespace: &str, name: &str) -> SandgateResult<()> {
        let key = Self::key(namespace, name);
        let (_, workload) = self
            .workloads
            .remove(&key)
            .ok_or_else(|| SandgateError::NotFound(name.to_string()))?;

        self.tombstones.insert(
            key,
            Tombstone {
                workload,
                deleted_mono: Instant::now(),
            },
        );

        Ok(())
    }

    async fn list_instances(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> SandgateResult<Vec<InstanceRecord>> {
        if self.failures.instance_lists.load(Ordering::SeqCst) {
            return Err(SandgateError::backend("injected instance list failure"));
        }

        let now = Instant::now();
        Ok(self
            .cached_workloads(namespace, now)
            .iter()
            .filter(|workload| selector.matches(&workload.manifest.labels))
            .flat_map(|workload| self.instance_records(workload, now))
            .collect())
    }

    async fn append_event(&self, namespace: &str, event: WorkloadEvent) -> SandgateResult<()> {
        if self.failures.event_appends.load(Ordering::SeqCst) {
            return Err(SandgateError::backend("injected event append failure"));
        }

        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push((namespace.to_string(), event));

        Ok(())
    }

    async fn list_events(
        &self,
        namespace: &str,
        object_name: &str,
        object_kind: &str,
    ) -> SandgateResult<Vec<WorkloadEvent>> {
        if self.failures.event_lists.load(Ordering::SeqCst) {
            return Err(SandgateError::backend("injected event list failure"));
        }

        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        Ok(events
            .iter()
            .filter(|(ns, event)| {
                ns == namespace
                    && event.object_name == object_name
                    && event.object_kind == object_kind
            })
            .map(|(_, event)| event.clone())
            .collect())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
