// # ipsync-core
//
// Core library for the ipsync address reconciliation daemon.
//
// ## Architecture Overview
//
// This library provides the core functionality for keeping a dependent
// process in sync with the host's public network address:
// - **AddressSource**: Trait for fetching the live public address
// - **HistoryStore**: Trait for the durable append-only address history
// - **ConfigRecord**: Trait for the key-value record the dependent process reads
// - **Restarter**: Trait for restarting the dependent process
// - **Reconciler**: Core engine that drives the fetch → compare → update loop
//
// ## Design Principles
//
// 1. **Separation of Concerns**: The decision logic is separate from I/O
// 2. **Single Writer**: One serialized loop, no concurrent pollers
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Idempotency**: Agreement between the three observations is a no-op

pub mod config;
pub mod envfile;
pub mod error;
pub mod reconciler;
pub mod restart;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::ReconcilerConfig;
pub use envfile::EnvFile;
pub use error::{Error, Result};
pub use reconciler::{Reconciler, TickOutcome, UpdateStage, update_required};
pub use restart::ComposeRestarter;
pub use state::MemoryHistoryStore;
pub use traits::{AddressRecord, AddressSource, ConfigRecord, HistoryStore, Restarter};
