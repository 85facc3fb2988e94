// # Address Source Trait
//
// Defines the interface for learning the host's current public
// network address from an external lookup service.
//
// ## Implementations
//
// - HTTP-based: `ipsync-fetch-http` crate
// - Test doubles: scripted sources in the contract tests
//
// ## Usage
//
// ```rust,ignore
// use ipsync_core::AddressSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* AddressSource implementation */;
//     let address = source.fetch().await?;
//     println!("public address: {address}");
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for address source implementations
///
/// A source issues exactly one lookup per `fetch()` call. It must not
/// retry internally: retry and backoff policy belong to the
/// [`Reconciler`](crate::Reconciler), which owns the failure counter.
///
/// The returned address is opaque text. Sources validate only that it
/// is non-empty and shaped like a single token (no embedded newlines);
/// semantic validation is out of scope.
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// Fetch the current public address
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: the observed address, trimmed and non-empty
    /// - `Err(Error::Network)`: connection or timeout failure
    /// - `Err(Error::Protocol)`: non-success response status
    /// - `Err(Error::Parse)`: malformed or incomplete response body
    /// - `Err(Error::EmptyAddress)`: the service answered with an empty value
    async fn fetch(&self) -> Result<String, crate::Error>;
}
