//! Bounded per-sandbox admission for cold-start traffic.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{SandgateError, SandgateResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Admission slots for requests activating a sandbox.
///
/// Every in-flight activation of one name holds a slot while the endpoint
/// is resolved, so a cold instance accumulates at most `depth` waiters.
/// When the slots are gone, further requests are shed immediately instead
/// of piling up behind the cold start.
pub struct WaitQueue {
    depth: usize,
    slots: DashMap<String, Arc<Semaphore>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl WaitQueue {
    /// Creates a queue admitting `depth` concurrent activations per name.
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            slots: DashMap::new(),
        }
    }

    /// Takes a slot for the named sandbox, failing fast when none is free.
    ///
    /// The slot is released when the returned permit drops.
    pub fn acquire(&self, name: &str) -> SandgateResult<OwnedSemaphorePermit> {
        let semaphore = self
            .slots
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.depth)))
            .clone();

        semaphore
            .try_acquire_owned()
            .map_err(|_| SandgateError::QueueFull(name.to_string()))
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
