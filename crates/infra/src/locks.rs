//! In-process keyed mutexes.
//!
//! Mutations take the locks they need in a fixed order:
//! `stock` → `staff:<id>` → `card:<birth id>` → `registry`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use evax_core::{BirthId, StaffId};

pub fn stock_key() -> String {
    "stock".to_string()
}

pub fn staff_key(staff_id: &StaffId) -> String {
    format!("staff:{staff_id}")
}

pub fn card_key(birth_id: &BirthId) -> String {
    format!("card:{birth_id}")
}

pub fn registry_key() -> String {
    "registry".to_string()
}

#[derive(Debug, Clone, Default)]
pub struct KeyedLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. Released when the guard drops.
    pub async fn lock(&self, key: String) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = match self.inner.lock() {
                Ok(map) => map,
                Err(poisoned) => poisoned.into_inner(),
            };
            // Drop entries nobody holds or waits on.
            map.retain(|_, m| Arc::strong_count(m) > 1);
            Arc::clone(map.entry(key).or_default())
        };
        mutex.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }
}
