//! Core reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Fetching the live public address via AddressSource
//! - Comparing it against the persisted history and the config record
//! - Pushing a changed address into the config record
//! - Restarting the dependent process so the change takes effect
//! - Recording the address in the history store
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐
//! │ AddressSource │── fetched address ──┐
//! └───────────────┘                     │
//!                                       ▼
//!                              ┌──────────────┐
//!                              │  Reconciler  │
//!                              └──────────────┘
//!                                       │
//!         ┌─────────────────────────────┼─────────────────────────────┐
//!         │                             │                             │
//!         ▼                             ▼                             ▼
//! ┌──────────────┐            ┌──────────────┐            ┌──────────────┐
//! │ ConfigRecord │            │  Restarter   │            │ HistoryStore │
//! │ (read/write) │            │  (invoke)    │            │ (latest/app) │
//! └──────────────┘            └──────────────┘            └──────────────┘
//! ```
//!
//! ## Tick Flow
//!
//! 1. Fetch the live address (failure → backoff, nothing touched)
//! 2. Read the configured value (absence is normal)
//! 3. Read the latest history record (absence is normal)
//! 4. Decide whether an update is required ([`update_required`])
//! 5. On mismatch: write config, restart, then append history
//! 6. Sleep for [`Reconciler::next_delay`] and go again
//!
//! The update order is deliberate: the history record is appended only
//! after the config write and the restart have both succeeded, so the
//! secondary records never claim an address the dependent process was
//! not asked to adopt. A restart failure therefore leaves history
//! stale and the very next tick re-runs the whole update, restart
//! included.

use crate::config::ReconcilerConfig;
use crate::error::Result;
use crate::traits::{AddressSource, ConfigRecord, HistoryStore, Restarter};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Which step of the update pipeline failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    /// Writing the new address into the config record
    ConfigWrite,
    /// Restarting the dependent process
    Restart,
}

/// Outcome of a single tick
///
/// All outcomes are also logged; the enum exists so the tick driver
/// can pick the next delay and so tests can observe the decision
/// logic without real time passing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The address changed and the full update pipeline succeeded
    Updated {
        /// The address that was applied
        address: String,
        /// The previously stored address, if any
        previous: Option<String>,
    },

    /// Live address, history, and config record all agree
    InSync {
        /// The current address
        address: String,
    },

    /// The address lookup failed
    FetchFailed {
        /// Consecutive fetch failures including this one
        consecutive: u32,
    },

    /// The history store could not be queried
    HistoryUnavailable,

    /// An update was required but a pipeline step failed
    UpdateFailed {
        /// The step that failed
        stage: UpdateStage,
        /// The address that was being applied
        address: String,
    },
}

/// Decide whether the three observations require an update
///
/// An update is required iff any of:
/// - (a) no stored record exists (first run)
/// - (b) the stored address differs from the fetched one
/// - (c) the configured value is present and differs from the stored
///   one (external drift between the two secondary records)
///
/// (a) and (b) are authoritative: a fetched address that differs from
/// history is sufficient on its own. (c) only catches the case where
/// history and the fetched address agree but the config record has
/// been edited or reset behind our back.
pub fn update_required(fetched: &str, stored: Option<&str>, configured: Option<&str>) -> bool {
    match stored {
        None => true,
        Some(s) if s != fetched => true,
        Some(s) => configured.is_some_and(|c| c != s),
    }
}

/// Core reconciliation engine
///
/// Runs one infinite fetch → compare → (update) → sleep loop on a
/// single task. All collaborator calls within a tick are awaited in
/// order; nothing overlaps, because each step's correctness depends on
/// the previous step's completed effect.
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Start with [`Reconciler::run()`]
/// 3. Runs until a shutdown signal is received
///
/// The only process-local state is the consecutive-failure counter;
/// durable truth lives in the history store and the config record.
pub struct Reconciler {
    /// Source of the live public address
    source: Box<dyn AddressSource>,

    /// Config record consumed by the dependent process
    config_record: Box<dyn ConfigRecord>,

    /// Append-only address history
    history: Box<dyn HistoryStore>,

    /// Restart capability for the dependent process
    restarter: Box<dyn Restarter>,

    /// Tunables
    config: ReconcilerConfig,

    /// Consecutive fetch failures; reset on any successful fetch
    consecutive_failures: u32,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `source`: address source implementation
    /// - `config_record`: config record accessor
    /// - `history`: history store implementation
    /// - `restarter`: restart capability implementation
    /// - `config`: reconciler tunables (validated here)
    pub fn new(
        source: Box<dyn AddressSource>,
        config_record: Box<dyn ConfigRecord>,
        history: Box<dyn HistoryStore>,
        restarter: Box<dyn Restarter>,
        config: ReconcilerConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            source,
            config_record,
            history,
            restarter,
            config,
            consecutive_failures: 0,
        })
    }

    /// Consecutive fetch failures observed so far
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Execute one full tick of the reconciliation loop
    ///
    /// Never returns an error: every collaborator failure is absorbed
    /// here, logged, and mapped to an outcome whose
    /// [`next_delay`](Self::next_delay) schedules the retry.
    pub async fn tick(&mut self) -> TickOutcome {
        // Step 1: fetch the live address.
        let fetched = match self.source.fetch().await {
            Ok(address) => address,
            Err(e) => {
                self.consecutive_failures += 1;
                warn!(
                    attempt = self.consecutive_failures,
                    threshold = self.config.failure_threshold,
                    error = %e,
                    "failed to fetch current address"
                );
                if self.consecutive_failures >= self.config.failure_threshold {
                    warn!("repeated fetch failures, switching to extended retry interval");
                }
                return TickOutcome::FetchFailed {
                    consecutive: self.consecutive_failures,
                };
            }
        };
        self.consecutive_failures = 0;
        debug!("fetched current address: {}", fetched);

        let key = self.config.monitored_key.clone();

        // Step 2: read the configured value. Absence (or an unreadable
        // record) is logged and treated as "no configured value".
        let configured = match self.config_record.read_value(&key).await {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                debug!("no {} entry in the config record yet", key);
                None
            }
            Err(e) => {
                warn!(error = %e, "could not read the config record");
                None
            }
        };

        // Step 3: read the latest history record. Absence is the
        // normal first-run outcome; a query error aborts the tick.
        let stored = match self.history.latest().await {
            Ok(Some(record)) => Some(record.address),
            Ok(None) => {
                info!("no address history yet, treating {} as the first observation", fetched);
                None
            }
            Err(e) => {
                warn!(error = %e, "history query failed, retrying shortly");
                return TickOutcome::HistoryUnavailable;
            }
        };

        // Step 4: the three-way comparison.
        if !update_required(&fetched, stored.as_deref(), configured.as_deref()) {
            debug!("no address change detected, current address: {}", fetched);
            return TickOutcome::InSync { address: fetched };
        }

        if let Some(ref s) = stored
            && s == &fetched
        {
            info!(
                "config record drifted from history (config: {:?}, stored: {}), re-applying",
                configured, s
            );
        }

        // Step 5a: push the new address into the config record.
        if let Err(e) = self.config_record.write_value(&key, &fetched).await {
            warn!(error = %e, "failed to update the config record, retrying shortly");
            return TickOutcome::UpdateFailed {
                stage: UpdateStage::ConfigWrite,
                address: fetched,
            };
        }
        info!("config record updated: {}={}", key, fetched);

        // Step 5b: restart the dependent process. On failure the
        // history append below is skipped, so the next tick re-runs
        // the whole update, restart included.
        if let Err(e) = self.restarter.restart().await {
            warn!(error = %e, "restart failed, the update will be re-attempted next tick");
            return TickOutcome::UpdateFailed {
                stage: UpdateStage::Restart,
                address: fetched,
            };
        }
        info!("dependent process restarted");

        // Step 5c: record the address. Best-effort: the external
        // effect has already happened, so a failure here must not
        // abort the tick or roll anything back.
        match self.history.append(&fetched).await {
            Ok(()) => info!("stored new address in history: {}", fetched),
            Err(e) => warn!(
                error = %e,
                "failed to record {} in history, the next tick will re-reconcile", fetched
            ),
        }

        TickOutcome::Updated {
            address: fetched,
            previous: stored,
        }
    }

    /// Delay to sleep before the next tick, given the last outcome
    ///
    /// Pure with respect to time: the schedule is fully determined by
    /// the outcome and the tunables, so tests can assert on it without
    /// sleeping.
    pub fn next_delay(&self, outcome: &TickOutcome) -> Duration {
        match outcome {
            TickOutcome::FetchFailed { consecutive } => {
                if *consecutive >= self.config.failure_threshold {
                    self.config.extended_interval()
                } else {
                    self.config.retry_interval()
                }
            }
            TickOutcome::HistoryUnavailable | TickOutcome::UpdateFailed { .. } => {
                self.config.retry_interval()
            }
            TickOutcome::Updated { .. } | TickOutcome::InSync { .. } => {
                self.config.check_interval()
            }
        }
    }

    /// Run the reconciliation loop
    ///
    /// Ticks run to completion; shutdown signals are only observed
    /// during the sleep between ticks. Runs until ctrl-c.
    pub async fn run(&mut self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Internal run implementation that accepts an optional shutdown signal
    async fn run_internal(
        &mut self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        info!(
            "reconciler started (check interval: {:?}, retry interval: {:?})",
            self.config.check_interval(),
            self.config.retry_interval()
        );

        if let Some(mut rx) = shutdown_rx {
            loop {
                let outcome = self.tick().await;
                let delay = self.next_delay(&outcome);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = &mut rx => {
                        info!("shutdown signal received");
                        break;
                    }
                }
            }
        } else {
            loop {
                let outcome = self.tick().await;
                let delay = self.next_delay(&outcome);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = tokio::signal::ctrl_c() => {
                        info!("shutdown signal received");
                        break;
                    }
                }
            }
        }

        info!("reconciler stopped");
        Ok(())
    }

    /// Run the loop with an externally controlled shutdown signal
    ///
    /// The daemon uses this to tie the loop to SIGTERM/SIGINT; tests
    /// use it to stop the loop deterministically.
    pub async fn run_with_shutdown(
        &mut self,
        shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    ) -> Result<()> {
        self.run_internal(Some(shutdown_rx)).await
    }
}
