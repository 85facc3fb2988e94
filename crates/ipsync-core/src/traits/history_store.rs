// # History Store Trait
//
// Defines the interface for the durable, append-only address history.
//
// ## Purpose
//
// The history store is one of the two secondary records the Reconciler
// compares against the live address. Only the most recent record is
// ever read; the full history is retained for diagnosis.
//
// ## Implementations
//
// - SQLite-backed: `ipsync-store-sqlite` crate
// - In-memory: [`MemoryHistoryStore`](crate::state::MemoryHistoryStore)

use async_trait::async_trait;

/// One observed address with the time it was recorded
///
/// Records are immutable once created. `observed_at` is
/// monotonically non-decreasing across inserts.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AddressRecord {
    /// The observed address, stored verbatim
    pub address: String,
    /// When the record was inserted
    pub observed_at: chrono::DateTime<chrono::Utc>,
}

impl AddressRecord {
    /// Create a record stamped with the current time
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            observed_at: chrono::Utc::now(),
        }
    }
}

/// Trait for history store implementations
///
/// The store has exactly one writer and one reader (the Reconciler,
/// which never overlaps with itself), so implementations need no
/// locking discipline beyond what their storage engine provides.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Return the record with the greatest `observed_at`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(AddressRecord))`: the most recent record
    /// - `Ok(None)`: no history yet — a normal first-run outcome,
    ///   not an error
    /// - `Err(Error::Persistence)`: storage-layer failure
    async fn latest(&self) -> Result<Option<AddressRecord>, crate::Error>;

    /// Insert a new immutable record with the current time
    ///
    /// # Returns
    ///
    /// - `Ok(())`: the record was durably appended
    /// - `Err(Error::Persistence)`: storage-layer failure
    async fn append(&self, address: &str) -> Result<(), crate::Error>;
}
