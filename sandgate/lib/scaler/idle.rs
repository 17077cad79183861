//! Periodic idle-policy sweep over all sandboxes.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::time;

use crate::{
    activation::ActivityTracker, lifecycle::SandboxController, sandbox::Sandbox, SandgateResult,
};

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// Decides what to do with one sandbox given its observed activity.
///
/// No policy ships with the gateway; deployments plug their own in. The
/// sweep hands every policy the latest observed request time, which is
/// `None` when no request was ever recorded or the query failed.
pub trait ScalePolicy: Send + Sync {
    /// Judges one sandbox at the given instant.
    fn evaluate(
        &self,
        sandbox: &Sandbox,
        last_request: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> ScaleAction;
}

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Verdict of a [`ScalePolicy`] for one sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleAction {
    /// Leave the sandbox as it is.
    Keep,

    /// Remove the sandbox entirely.
    Delete,

    /// Scale the workload down without removing its record.
    ScaleDown,
}

/// Sweeps all sandboxes on an interval and applies the policy's verdicts.
///
/// Deletions go through the controller. Scale-down is recorded in the log
/// only; executing it is the backend's business. One sandbox failing its
/// verdict does not stop the sweep.
pub struct IdleScaler<P: ScalePolicy> {
    controller: Arc<SandboxController>,
    tracker: ActivityTracker,
    policy: P,
    interval: Duration,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<P: ScalePolicy> IdleScaler<P> {
    /// Creates a scaler sweeping at the given interval.
    pub fn new(
        controller: Arc<SandboxController>,
        tracker: ActivityTracker,
        policy: P,
        interval: Duration,
    ) -> Self {
        Self {
            controller,
            tracker,
            policy,
            interval,
        }
    }

    /// Runs sweeps forever.
    pub async fn run(&self) {
        let mut ticker = time::interval(self.interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                tracing::warn!("idle sweep failed: {e}");
            }
        }
    }

    /// Evaluates every sandbox once and applies the verdicts.
    pub async fn run_once(&self) -> SandgateResult<()> {
        let sandboxes = self.controller.list().await?;
        let now = Utc::now();

        for sandbox in &sandboxes {
            let last_request = self.tracker.last_request_time(&sandbox.name).await;

            match self.policy.evaluate(sandbox, last_request, now) {
                ScaleAction::Keep => {}
                ScaleAction::Delete => {
                    tracing::info!(sandbox = %sandbox.name, "idle policy elected deletion");
                    if let Err(e) = self.controller.delete(&sandbox.name).await {
                        tracing::warn!(sandbox = %sandbox.name, "idle deletion failed: {e}");
                    }
                }
                ScaleAction::ScaleDown => {
                    tracing::info!(sandbox = %sandbox.name, "idle policy elected scale-down");
                }
            }
        }

        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
