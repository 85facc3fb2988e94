// # Restarter Trait
//
// Defines the interface for restarting the dependent process after a
// configuration change.
//
// ## Implementations
//
// - Docker Compose: [`ComposeRestarter`](crate::restart::ComposeRestarter)
// - Test doubles: recording restarters in the contract tests

use async_trait::async_trait;

/// Trait for restart capability implementations
///
/// The call is deliberately blocking within a tick: the Reconciler
/// must not record the new address until the restart attempt has
/// completed, because the secondary records should only reflect an
/// address the dependent process has actually been asked to adopt.
/// No timeout governs the invocation itself.
#[async_trait]
pub trait Restarter: Send + Sync {
    /// Invoke the external lifecycle command and wait for it to exit
    ///
    /// # Returns
    ///
    /// - `Ok(())`: the command exited zero
    /// - `Err(Error::Restart)`: non-zero exit or spawn failure, with
    ///   the captured combined output attached
    async fn restart(&self) -> Result<(), crate::Error>;
}
