//! Per-name async locks serializing lifecycle mutations.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Hands out one async mutex per sandbox name.
///
/// Creation and deletion of the same name serialize on its lock, so two
/// concurrent creates cannot both pass the duplicate check and a delete
/// cannot interleave with a create of the same name. Entries are retained
/// for the process lifetime; removing one would race with waiters already
/// holding its Arc.
#[derive(Debug, Default)]
pub struct NameLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl NameLocks {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for a name, waiting while another holder has it.
    pub async fn acquire(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(name.to_string()).or_default().clone();
        lock.lock_owned().await
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
