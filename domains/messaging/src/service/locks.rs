//! Per-pair mutual exclusion
//!
//! Appends and mark-seen for the same pair run one at a time. Different
//! pairs never contend.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::entities::PairCode;

#[derive(Clone, Default)]
pub struct PairLocks {
    locks: Arc<DashMap<PairCode, Arc<Mutex<()>>>>,
}

impl PairLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a pair. Released when the guard drops.
    pub async fn acquire(&self, pair_id: &PairCode) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(pair_id.clone()).or_default().clone();
        lock.lock_owned().await
    }
}
