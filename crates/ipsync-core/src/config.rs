//! Configuration types for the ipsync system
//!
//! This module defines the Reconciler tunables. The daemon fills these
//! from environment variables; embedders construct them directly.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconciler tunables
///
/// The defaults mirror the deployed service: a 10 second check
/// interval, a 5 second retry interval, and an extended backoff of
/// twice the check interval after 5 consecutive fetch failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Key in the config record that carries the pushed address
    pub monitored_key: String,

    /// Seconds between ticks when the last tick succeeded
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    /// Seconds before retrying after a transient failure
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,

    /// Consecutive fetch failures before the extended backoff kicks in
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Multiplier applied to the check interval for the extended backoff
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,
}

impl ReconcilerConfig {
    /// Create a configuration with defaults for the given key
    pub fn new(monitored_key: impl Into<String>) -> Self {
        Self {
            monitored_key: monitored_key.into(),
            check_interval_secs: default_check_interval_secs(),
            retry_interval_secs: default_retry_interval_secs(),
            failure_threshold: default_failure_threshold(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.monitored_key.is_empty() {
            return Err(crate::Error::config("monitored key cannot be empty"));
        }
        if self.monitored_key.contains('=') || self.monitored_key.contains('\n') {
            return Err(crate::Error::config(
                "monitored key cannot contain '=' or newlines",
            ));
        }
        if self.check_interval_secs == 0 {
            return Err(crate::Error::config("check interval must be > 0"));
        }
        if self.retry_interval_secs == 0 {
            return Err(crate::Error::config("retry interval must be > 0"));
        }
        if self.failure_threshold == 0 {
            return Err(crate::Error::config("failure threshold must be > 0"));
        }
        if self.backoff_multiplier < 2 {
            return Err(crate::Error::config("backoff multiplier must be >= 2"));
        }
        Ok(())
    }

    /// Standard interval between successful ticks
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Short interval before retrying a failed tick
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    /// Extended interval used once the failure threshold is reached
    pub fn extended_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs * u64::from(self.backoff_multiplier))
    }
}

fn default_check_interval_secs() -> u64 {
    10
}

fn default_retry_interval_secs() -> u64 {
    5
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_backoff_multiplier() -> u32 {
    2
}
