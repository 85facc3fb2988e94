//! Core trait definitions
//!
//! These traits define the seams between the Reconciler and its
//! collaborators. Implementations live in dedicated crates
//! (`ipsync-fetch-http`, `ipsync-store-sqlite`) or in-process
//! (`EnvFile`, `MemoryHistoryStore`).

pub mod address_source;
pub mod config_record;
pub mod history_store;
pub mod restarter;

pub use address_source::AddressSource;
pub use config_record::ConfigRecord;
pub use history_store::{AddressRecord, HistoryStore};
pub use restarter::Restarter;
