//! Per-network serialization

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Held while one logical operation runs against a network
pub struct NetworkGuard {
    network_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl NetworkGuard {
    pub fn network_id(&self) -> &str {
        &self.network_id
    }
}

/// One async mutex per network id. Entries nobody holds or waits on are
/// pruned on the next acquisition.
#[derive(Default)]
pub struct NetworkLocks {
    active_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl NetworkLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, network_id: &str) -> NetworkGuard {
        let lock = {
            let mut active = self.active_locks.lock().await;
            active.retain(|_, lock| Arc::strong_count(lock) > 1);
            active
                .entry(network_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        NetworkGuard {
            network_id: network_id.to_string(),
            _guard: lock.lock_owned().await,
        }
    }

    /// Networks with a holder or waiter
    pub async fn tracked(&self) -> usize {
        let active = self.active_locks.lock().await;
        active
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}
