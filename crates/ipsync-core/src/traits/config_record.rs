// # Config Record Trait
//
// Defines the interface for the key-value text record consumed by the
// dependent process. The record holds the last address that was pushed
// to that process, alongside unrelated keys owned by other tooling.
//
// ## Implementations
//
// - Flat env file: [`EnvFile`](crate::envfile::EnvFile)
// - Test doubles: in-memory maps in the contract tests

use async_trait::async_trait;

/// Trait for config record accessors
///
/// Updates must be idempotent replace-or-append: after any write there
/// is at most one line for the monitored key, and every unrelated line
/// is preserved byte-for-byte in its original position.
#[async_trait]
pub trait ConfigRecord: Send + Sync {
    /// Read the current value for a key
    ///
    /// # Returns
    ///
    /// - `Ok(Some(String))`: the configured value
    /// - `Ok(None)`: the record or the key does not exist yet — an
    ///   expected outcome, never escalated as fatal
    /// - `Err(Error::Io)`: read failure of the underlying record
    async fn read_value(&self, key: &str) -> Result<Option<String>, crate::Error>;

    /// Replace the key's line in place, or append `key=value` if absent
    ///
    /// The rewrite must be atomic enough that a crash mid-write cannot
    /// silently truncate unrelated keys.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: the record now carries exactly one `key=value` line
    /// - `Err(Error::Io)`: read/write failure of the underlying record
    async fn write_value(&self, key: &str, value: &str) -> Result<(), crate::Error>;
}
