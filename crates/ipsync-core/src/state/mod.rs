// # History Store Implementations
//
// In-process implementations of the HistoryStore trait. The durable
// SQLite store lives in the `ipsync-store-sqlite` crate.

pub mod memory;

pub use memory::MemoryHistoryStore;
