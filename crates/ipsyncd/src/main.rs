// # ipsyncd - Address Reconciliation Daemon
//
// The ipsyncd daemon is responsible for:
// 1. Reading configuration from environment variables (with an
//    env-file overlay)
// 2. Initializing logging and the runtime
// 3. Opening the history database (the one fatal startup step)
// 4. Wiring the collaborators and running the Reconciler
//
// ## Configuration
//
// All configuration is done via environment variables. Values missing
// from the process environment are read from the env file itself, so
// a single `.env` can drive both this daemon and the dependent
// process.
//
// - `IPSYNC_ENV_FILE`: Path to the shared env file (default: `.env`)
// - `IPSYNC_LOOKUP_URL`: Address lookup endpoint
//   (default: `https://api.ipify.org?format=json`)
// - `IPSYNC_DB_PATH`: History database path (default: `ip_store.db`)
// - `IPSYNC_MONITORED_KEY`: Key in the env file carrying the pushed
//   address (default: `CHARON_P2P_EXTERNAL_HOSTNAME`)
// - `IPSYNC_SERVICE`: Compose service to recreate on change
//   (default: `charon`)
// - `IPSYNC_CHECK_INTERVAL_SECS`: Seconds between checks (default: 10)
// - `IPSYNC_RETRY_INTERVAL_SECS`: Seconds before retrying a failed
//   tick (default: 5)
// - `IPSYNC_FAILURE_THRESHOLD`: Consecutive fetch failures before the
//   extended backoff (default: 5)
// - `IPSYNC_REQUEST_TIMEOUT_SECS`: Lookup request timeout (default: 10)
// - `IPSYNC_LOG_LEVEL`: trace|debug|info|warn|error (default: info)
//
// ## Example
//
// ```bash
// export IPSYNC_ENV_FILE=/srv/stack/.env
// export IPSYNC_DB_PATH=/var/lib/ipsync/ip_store.db
// export IPSYNC_SERVICE=charon
//
// ipsyncd
// ```

use anyhow::Result;
use std::collections::HashMap;
use std::env;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use ipsync_core::{ComposeRestarter, EnvFile, Reconciler, ReconcilerConfig};
use ipsync_fetch_http::HttpAddressSource;
use ipsync_store_sqlite::SqliteHistoryStore;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum IpsyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<IpsyncExitCode> for ExitCode {
    fn from(code: IpsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    env_file: String,
    lookup_url: String,
    db_path: String,
    monitored_key: String,
    service: String,
    check_interval_secs: u64,
    retry_interval_secs: u64,
    failure_threshold: u32,
    request_timeout_secs: u64,
    log_level: String,
}

impl Config {
    /// Load configuration from the environment, with env-file overlay
    ///
    /// The env file named by `IPSYNC_ENV_FILE` is read first; process
    /// environment variables win over values found in the file. A
    /// missing or unreadable env file is a warning, never fatal.
    async fn load() -> Self {
        let env_file = env::var("IPSYNC_ENV_FILE").unwrap_or_else(|_| ".env".to_string());

        let overlay: HashMap<String, String> = match EnvFile::new(&env_file).read_all().await {
            Ok(pairs) => pairs.into_iter().collect(),
            Err(e) => {
                eprintln!("warning: could not load env file {env_file}: {e}");
                HashMap::new()
            }
        };

        let lookup = |key: &str| env::var(key).ok().or_else(|| overlay.get(key).cloned());

        Self {
            env_file,
            lookup_url: lookup("IPSYNC_LOOKUP_URL")
                .unwrap_or_else(|| ipsync_fetch_http::DEFAULT_LOOKUP_URL.to_string()),
            db_path: lookup("IPSYNC_DB_PATH").unwrap_or_else(|| "ip_store.db".to_string()),
            monitored_key: lookup("IPSYNC_MONITORED_KEY")
                .unwrap_or_else(|| "CHARON_P2P_EXTERNAL_HOSTNAME".to_string()),
            service: lookup("IPSYNC_SERVICE").unwrap_or_else(|| "charon".to_string()),
            check_interval_secs: lookup("IPSYNC_CHECK_INTERVAL_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            retry_interval_secs: lookup("IPSYNC_RETRY_INTERVAL_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            failure_threshold: lookup("IPSYNC_FAILURE_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            request_timeout_secs: lookup("IPSYNC_REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            log_level: lookup("IPSYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.lookup_url.is_empty() {
            anyhow::bail!("IPSYNC_LOOKUP_URL cannot be empty");
        }
        if !self.lookup_url.starts_with("https://") && !self.lookup_url.starts_with("http://") {
            anyhow::bail!(
                "IPSYNC_LOOKUP_URL must use HTTP or HTTPS scheme. Got: {}",
                self.lookup_url
            );
        }

        if self.db_path.is_empty() {
            anyhow::bail!("IPSYNC_DB_PATH cannot be empty");
        }

        if self.monitored_key.is_empty() {
            anyhow::bail!(
                "IPSYNC_MONITORED_KEY cannot be empty. \
                Set it via: export IPSYNC_MONITORED_KEY=MY_ADDR_KEY"
            );
        }
        if self.monitored_key.contains('=') {
            anyhow::bail!(
                "IPSYNC_MONITORED_KEY cannot contain '='. Got: {}",
                self.monitored_key
            );
        }

        if self.service.is_empty() {
            anyhow::bail!("IPSYNC_SERVICE cannot be empty");
        }

        if !(1..=3600).contains(&self.check_interval_secs) {
            anyhow::bail!(
                "IPSYNC_CHECK_INTERVAL_SECS must be between 1 and 3600. Got: {}",
                self.check_interval_secs
            );
        }
        if !(1..=300).contains(&self.retry_interval_secs) {
            anyhow::bail!(
                "IPSYNC_RETRY_INTERVAL_SECS must be between 1 and 300. Got: {}",
                self.retry_interval_secs
            );
        }
        if !(1..=100).contains(&self.failure_threshold) {
            anyhow::bail!(
                "IPSYNC_FAILURE_THRESHOLD must be between 1 and 100. Got: {}",
                self.failure_threshold
            );
        }
        if !(1..=300).contains(&self.request_timeout_secs) {
            anyhow::bail!(
                "IPSYNC_REQUEST_TIMEOUT_SECS must be between 1 and 300. Got: {}",
                self.request_timeout_secs
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "IPSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn main() -> ExitCode {
    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {e}");
            return IpsyncExitCode::RuntimeError.into();
        }
    };

    // Load configuration (env file overlay needs the runtime)
    let config = rt.block_on(Config::load());

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {e}");
        return IpsyncExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return IpsyncExitCode::ConfigError.into();
    }

    info!("Starting ipsyncd daemon");

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {e}");
            IpsyncExitCode::RuntimeError
        } else {
            IpsyncExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    info!("Monitored key: {}", config.monitored_key);
    info!("Config record: {}", config.env_file);
    info!("History database: {}", config.db_path);
    info!("Dependent service: {}", config.service);

    // The history store is the one collaborator whose startup failure
    // is fatal: without durable history the system cannot safely
    // operate.
    let history = SqliteHistoryStore::open(&config.db_path)
        .map_err(|e| anyhow::anyhow!("failed to initialize history database: {e}"))?;

    let source = HttpAddressSource::with_timeout(
        config.lookup_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let record = EnvFile::new(&config.env_file);
    let restarter = ComposeRestarter::new(&config.service);

    let mut reconciler_config = ReconcilerConfig::new(&config.monitored_key);
    reconciler_config.check_interval_secs = config.check_interval_secs;
    reconciler_config.retry_interval_secs = config.retry_interval_secs;
    reconciler_config.failure_threshold = config.failure_threshold;

    let mut reconciler = Reconciler::new(
        Box::new(source),
        Box::new(record),
        Box::new(history),
        Box::new(restarter),
        reconciler_config,
    )?;

    // Tie the loop to SIGTERM/SIGINT; ticks in progress run to
    // completion before the signal is observed.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let name = wait_for_shutdown_signal().await;
        info!("Received shutdown signal: {name}");
        let _ = shutdown_tx.send(());
    });

    info!("Monitoring address changes");
    reconciler.run_with_shutdown(shutdown_rx).await?;

    info!("Shutting down daemon");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> &'static str {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to setup SIGTERM handler: {e}");
            // Fall back to ctrl-c only
            let _ = tokio::signal::ctrl_c().await;
            return "SIGINT";
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to setup SIGINT handler: {e}");
            sigterm.recv().await;
            return "SIGTERM";
        }
    };

    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "SIGINT"
}
