// # Memory History Store
//
// In-memory implementation of HistoryStore.
//
// ## Purpose
//
// Provides a simple, fast history that doesn't persist across
// restarts. Useful for testing and embedded use.
//
// ## Crash Behavior
//
// - All history is lost on restart/crash
// - First run after a crash treats the fetched address as new and
//   re-applies it (harmless: the update path is idempotent)

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::history_store::{AddressRecord, HistoryStore};

/// In-memory history store implementation
///
/// # Example
///
/// ```rust,no_run
/// use ipsync_core::state::MemoryHistoryStore;
/// use ipsync_core::traits::HistoryStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryHistoryStore::new();
///
///     store.append("203.0.113.5").await?;
///     let latest = store.latest().await?;
///     assert_eq!(latest.map(|r| r.address).as_deref(), Some("203.0.113.5"));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    records: Arc<RwLock<Vec<AddressRecord>>>,
}

impl MemoryHistoryStore {
    /// Create a new empty memory history store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records appended so far
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Snapshot of the full history, oldest first
    pub async fn snapshot(&self) -> Vec<AddressRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn latest(&self) -> Result<Option<AddressRecord>, Error> {
        Ok(self.records.read().await.last().cloned())
    }

    async fn append(&self, address: &str) -> Result<(), Error> {
        self.records.write().await.push(AddressRecord::new(address));
        Ok(())
    }
}
