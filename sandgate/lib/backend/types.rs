//! Types crossing the orchestration backend boundary.

use std::{collections::BTreeMap, net::IpAddr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Desired state submitted to the backend for one sandbox workload.
///
/// The manifest is submitted in a single call, so the spec annotation and the
/// workload itself cannot diverge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadManifest {
    /// Workload name. Matches the sandbox name.
    pub name: String,

    /// Namespace the workload lives in.
    pub namespace: String,

    /// Labels set on the workload and its instances.
    pub labels: BTreeMap<String, String>,

    /// Opaque annotations stored with the workload.
    pub annotations: BTreeMap<String, String>,

    /// Desired instance count.
    pub replicas: u32,

    /// Container image instances run.
    pub image: String,

    /// Container args, overriding any command baked into the image.
    pub args: Vec<String>,

    /// Working directory for the container.
    pub workdir: String,

    /// Environment applied to every instance.
    pub env: Vec<EnvVar>,

    /// Resource requests and limits.
    pub resources: ResourceRequirements,

    /// Ports the workload exposes.
    pub ports: Vec<u16>,
}

/// One environment variable on an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    /// Variable name.
    pub name: String,

    /// Where the value comes from.
    pub value: EnvValue,
}

/// Source of an environment variable's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvValue {
    /// A fixed value.
    Literal(String),

    /// The backend substitutes the instance's own name.
    InstanceName,
}

/// Resource requests and limits as quantity strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    /// Guaranteed resources.
    pub requests: ResourceQuantities,

    /// Upper bounds.
    pub limits: ResourceQuantities,
}

/// A CPU and memory quantity pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceQuantities {
    /// CPU quantity, e.g. `100m`.
    pub cpu: String,

    /// Memory quantity, e.g. `128Mi`.
    pub memory: String,
}

/// Observed state of a workload as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadRecord {
    /// The manifest as stored.
    pub manifest: WorkloadManifest,

    /// Instance count the backend is converging toward.
    pub desired_replicas: u32,

    /// Instances currently reporting ready.
    pub ready_replicas: u32,

    /// When the workload was accepted.
    pub created_at: DateTime<Utc>,
}

/// One running or starting instance of a workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    /// Instance name, unique within the namespace.
    pub name: String,

    /// Labels inherited from the workload.
    pub labels: BTreeMap<String, String>,

    /// Routable address, absent until the backend assigns one.
    pub address: Option<IpAddr>,

    /// Whether the instance reports ready.
    pub ready: bool,
}

/// An append-only activity event addressed to a backend object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadEvent {
    /// Name of the object the event is about.
    pub object_name: String,

    /// Kind of the object the event is about.
    pub object_kind: String,

    /// Machine-readable reason, e.g. `LastRequestTime`.
    pub reason: String,

    /// Context attached to the event.
    pub annotations: BTreeMap<String, String>,

    /// Component that emitted the event.
    pub component: String,

    /// When the event was observed.
    pub timestamp: DateTime<Utc>,
}

/// Equality-matching label selector for cached reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: BTreeMap<String, String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl WorkloadRecord {
    /// Whether every desired instance reports ready.
    pub fn is_ready(&self) -> bool {
        self.desired_replicas > 0 && self.ready_replicas == self.desired_replicas
    }
}

impl LabelSelector {
    /// Creates a selector with no requirements, matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality requirement.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements.insert(key.into(), value.into());
        self
    }

    /// Whether the given label set satisfies every requirement.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
