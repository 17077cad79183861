//! Last-request and last-response activity bookkeeping.

use chrono::{DateTime, Utc};

use crate::{
    backend::WorkloadEvent,
    config::{ACTIVATOR_COMPONENT, LAST_REQUEST_REASON, LAST_RESPONSE_REASON, WORKLOAD_KIND},
    store::WorkloadStore,
    SandgateError, SandgateResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The two activity signals recorded per sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    /// A request was routed to the sandbox.
    Request,

    /// A proxied response finished streaming back.
    Response,
}

/// Records and queries per-sandbox activity on the backend's event stream.
///
/// Each observation is one appended event; the stream is never rewritten.
/// Queries take the most recent matching event, so retention is whatever
/// the backend keeps. Recording must never slow down or fail the request
/// path, so the public recorders run detached and only log failures.
#[derive(Clone)]
pub struct ActivityTracker {
    store: WorkloadStore,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ActivityKind {
    /// Event reason this kind is recorded under.
    pub fn reason(&self) -> &'static str {
        match self {
            ActivityKind::Request => LAST_REQUEST_REASON,
            ActivityKind::Response => LAST_RESPONSE_REASON,
        }
    }
}

impl ActivityTracker {
    /// Creates a tracker appending to the given store's backend.
    pub fn new(store: WorkloadStore) -> Self {
        Self { store }
    }

    /// Records that a request was routed to the sandbox. Detached and
    /// best-effort.
    pub fn record_last_request(&self, name: &str) {
        self.spawn_record(ActivityKind::Request, name);
    }

    /// Records that a proxied response completed. Detached and best-effort.
    pub fn record_last_response(&self, name: &str) {
        self.spawn_record(ActivityKind::Response, name);
    }

    /// Timestamp of the most recent request routed to the sandbox.
    ///
    /// `None` means unknown: no events yet, or the query failed. It is never
    /// an epoch timestamp.
    pub async fn last_request_time(&self, name: &str) -> Option<DateTime<Utc>> {
        self.latest(ActivityKind::Request, name).await
    }

    /// Timestamp of the most recent completed response, `None` when unknown.
    pub async fn last_response_time(&self, name: &str) -> Option<DateTime<Utc>> {
        self.latest(ActivityKind::Response, name).await
    }

    /// Appends one activity event for the sandbox.
    ///
    /// The sandbox's workload is looked up through the backend cache and its
    /// annotations ride along as event context. A sandbox the cache does not
    /// know is reported as [`SandgateError::NotFound`].
    pub async fn record(&self, kind: ActivityKind, name: &str) -> SandgateResult<()> {
        let Some(record) = self.store.cached_record(name).await? else {
            return Err(SandgateError::NotFound(name.to_string()));
        };

        let event = WorkloadEvent {
            object_name: name.to_string(),
            object_kind: WORKLOAD_KIND.to_string(),
            reason: kind.reason().to_string(),
            annotations: record.manifest.annotations.clone(),
            component: ACTIVATOR_COMPONENT.to_string(),
            timestamp: Utc::now(),
        };

        self.store
            .backend()
            .append_event(self.store.namespace(), event)
            .await
    }

    /// Runs `record` detached from the caller, swallowing failures.
    fn spawn_record(&self, kind: ActivityKind, name: &str) {
        let tracker = self.clone();
        let name = name.to_string();

        // During shutdown there may be no runtime left to spawn on.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                sandbox = %name,
                reason = kind.reason(),
                "no runtime to record activity on"
            );
            return;
        };

        handle.spawn(async move {
            if let Err(e) = tracker.record(kind, &name).await {
                tracing::warn!(
                    sandbox = %name,
                    reason = kind.reason(),
                    "activity record failed: {e}"
                );
            }
        });
    }

    async fn latest(&self, kind: ActivityKind, name: &str) -> Option<DateTime<Utc>> {
        let events = match self
            .store
            .backend()
            .list_events(self.store.namespace(), name, WORKLOAD_KIND)
            .await
        {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(sandbox = %name, "activity query failed: {e}");
                return None;
            }
        };

        events
            .iter()
            .filter(|event| event.reason == kind.reason())
            .map(|event| event.timestamp)
            .max()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
