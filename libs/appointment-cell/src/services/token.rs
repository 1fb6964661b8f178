use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use shared_database::{ClinicStore, StoreResult};
use shared_models::appointment::BookingScope;

/// Idle scope locks are pruned once the map grows past this size.
const PRUNE_THRESHOLD: usize = 1024;

/// One async mutex per booking scope. Holding the guard linearizes the
/// capacity check, token read and insert for that scope; other scopes are
/// unaffected.
#[derive(Default)]
pub struct ScopeLocks {
    locks: Mutex<HashMap<BookingScope, Arc<Mutex<()>>>>,
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, scope: BookingScope) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            if locks.len() >= PRUNE_THRESHOLD {
                // Entries held only by the map have no owner or waiter.
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(scope).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

/// Hands out per-scope token numbers: highest issued token plus one.
/// Cancelled appointments keep their token, so numbers are never reused.
pub struct TokenSequencer {
    store: Arc<dyn ClinicStore>,
    locks: ScopeLocks,
}

impl TokenSequencer {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self {
            store,
            locks: ScopeLocks::new(),
        }
    }

    pub async fn lock_scope(&self, scope: BookingScope) -> OwnedMutexGuard<()> {
        self.locks.acquire(scope).await
    }

    pub async fn next_token(&self, scope: &BookingScope) -> StoreResult<u32> {
        let next = self.store.max_token(scope).await?.map_or(1, |max| max + 1);
        debug!("Next token in scope {} is {}", scope, next);
        Ok(next)
    }
}
