// # Compose Restarter
//
// Restarter implementation that shells out to Docker Compose to force
// a recreation of the dependent service, so a changed config record
// takes effect.
//
// The invocation blocks until the command exits and captures combined
// stdout+stderr for error reporting. Exit code zero is success.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::Error;
use crate::traits::Restarter;

/// Restarter that runs `docker compose up <service> -d --force-recreate`
#[derive(Debug, Clone)]
pub struct ComposeRestarter {
    service: String,
}

impl ComposeRestarter {
    /// Create a restarter for the named compose service
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// The compose service this restarter recreates
    pub fn service(&self) -> &str {
        &self.service
    }
}

#[async_trait]
impl Restarter for ComposeRestarter {
    async fn restart(&self) -> Result<(), Error> {
        info!("restarting {} container", self.service);

        let output = Command::new("docker")
            .args(["compose", "up", &self.service, "-d", "--force-recreate"])
            .output()
            .await
            .map_err(|e| {
                Error::restart(
                    format!("failed to launch docker compose: {e}"),
                    String::new(),
                )
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(Error::restart(
                format!(
                    "docker compose exited with {} for service {}",
                    output.status, self.service
                ),
                combined,
            ));
        }

        debug!("compose output: {}", combined.trim_end());
        info!("successfully restarted {} container", self.service);
        Ok(())
    }
}
