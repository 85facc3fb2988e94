//! Test doubles and common utilities for the reconciliation contract
//! tests
//!
//! The doubles are cheaply cloneable and share their counters, so a
//! test can hand one clone to the Reconciler and keep another to
//! observe what happened.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use ipsync_core::error::Result;
use ipsync_core::traits::{AddressRecord, AddressSource, ConfigRecord, HistoryStore, Restarter};
use ipsync_core::{Error, ReconcilerConfig};

/// An address source that replays a script of fetch results
///
/// When the script runs out, the last entry repeats.
#[derive(Clone)]
pub struct ScriptedSource {
    script: Arc<std::sync::Mutex<VecDeque<std::result::Result<String, String>>>>,
    last: Arc<std::sync::Mutex<Option<std::result::Result<String, String>>>>,
    fetch_calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            script: Arc::new(std::sync::Mutex::new(VecDeque::new())),
            last: Arc::new(std::sync::Mutex::new(None)),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a successful fetch of the given address
    pub fn push_address(&self, address: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(address.to_string()));
        self
    }

    /// Queue a failed fetch
    pub fn push_failure(&self, message: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddressSource for ScriptedSource {
    async fn fetch(&self) -> Result<String> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let next = {
            let mut script = self.script.lock().unwrap();
            match script.pop_front() {
                Some(entry) => {
                    *self.last.lock().unwrap() = Some(entry.clone());
                    entry
                }
                None => self
                    .last
                    .lock()
                    .unwrap()
                    .clone()
                    .expect("ScriptedSource used with an empty script"),
            }
        };
        next.map_err(Error::network)
    }
}

/// An in-memory config record with injectable failures
#[derive(Clone)]
pub struct MemoryConfigRecord {
    values: Arc<std::sync::Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
    write_calls: Arc<AtomicUsize>,
}

impl MemoryConfigRecord {
    pub fn new() -> Self {
        Self {
            values: Arc::new(std::sync::Mutex::new(HashMap::new())),
            fail_writes: Arc::new(AtomicBool::new(false)),
            write_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn seed(&self, key: &str, value: &str) -> &Self {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn write_call_count(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigRecord for MemoryConfigRecord {
    async fn read_value(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn write_value(&self, key: &str, value: &str) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::io("injected write failure"));
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A history store with injectable failures on either operation
#[derive(Clone)]
pub struct FlakyHistoryStore {
    records: Arc<std::sync::Mutex<Vec<AddressRecord>>>,
    fail_latest: Arc<AtomicBool>,
    fail_append: Arc<AtomicBool>,
    append_calls: Arc<AtomicUsize>,
}

impl FlakyHistoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(std::sync::Mutex::new(Vec::new())),
            fail_latest: Arc::new(AtomicBool::new(false)),
            fail_append: Arc::new(AtomicBool::new(false)),
            append_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_fail_latest(&self, fail: bool) {
        self.fail_latest.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_append(&self, fail: bool) {
        self.fail_append.store(fail, Ordering::SeqCst);
    }

    pub fn seed(&self, address: &str) -> &Self {
        self.records
            .lock()
            .unwrap()
            .push(AddressRecord::new(address));
        self
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn latest_address(&self) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .last()
            .map(|r| r.address.clone())
    }

    pub fn append_call_count(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistoryStore for FlakyHistoryStore {
    async fn latest(&self) -> Result<Option<AddressRecord>> {
        if self.fail_latest.load(Ordering::SeqCst) {
            return Err(Error::persistence("injected query failure"));
        }
        Ok(self.records.lock().unwrap().last().cloned())
    }

    async fn append(&self, address: &str) -> Result<()> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(Error::persistence("injected insert failure"));
        }
        self.records
            .lock()
            .unwrap()
            .push(AddressRecord::new(address));
        Ok(())
    }
}

/// A restarter that records invocations and can be told to fail
#[derive(Clone)]
pub struct RecordingRestarter {
    restart_calls: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl RecordingRestarter {
    pub fn new() -> Self {
        Self {
            restart_calls: Arc::new(AtomicUsize::new(0)),
            fail: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn restart_call_count(&self) -> usize {
        self.restart_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Restarter for RecordingRestarter {
    async fn restart(&self) -> Result<()> {
        self.restart_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::restart(
                "injected restart failure",
                "simulated output",
            ));
        }
        Ok(())
    }
}

/// The key used by all contract tests
pub const TEST_KEY: &str = "PUBLIC_ADDR";

/// Reconciler tunables used by the contract tests
pub fn test_config() -> ReconcilerConfig {
    let mut config = ReconcilerConfig::new(TEST_KEY);
    config.check_interval_secs = 10;
    config.retry_interval_secs = 5;
    config.failure_threshold = 3;
    config.backoff_multiplier = 2;
    config
}
