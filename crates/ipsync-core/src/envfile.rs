// # Env File Config Record
//
// Flat-file implementation of ConfigRecord over `KEY=VALUE` lines.
//
// ## Purpose
//
// The dependent process reads its configuration from an env file that
// also carries keys owned by other tooling. This accessor rewrites a
// single monitored key while leaving every unrelated line untouched.
//
// ## Crash Safety
//
// - Atomic writes: the full record is written to a temporary path and
//   renamed over the original, so a crash mid-write cannot truncate
//   unrelated keys.
// - Missing file or missing key reads as absent, never as an error.
//
// The line-rewrite logic is a pure function ([`apply_key`]) kept
// separate from the I/O so the preservation invariant can be tested
// directly.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::ConfigRecord;

/// Rewrite `content` so it carries exactly one `key=value` line
///
/// The first line starting with `key=` is replaced in place; any later
/// duplicates of the key are dropped. If the key is absent the new
/// line is appended at the end, before a trailing final newline if one
/// exists. All other lines keep their bytes and their position.
pub fn apply_key(content: &str, key: &str, value: &str) -> String {
    let prefix = format!("{key}=");
    let replacement = format!("{key}={value}");

    let mut lines: Vec<&str> = content.split('\n').collect();
    let mut replaced = false;
    lines.retain_mut(|line| {
        if line.starts_with(&prefix) {
            if replaced {
                return false;
            }
            *line = &replacement;
            replaced = true;
        }
        true
    });

    if !replaced {
        // Keep the trailing final newline where the file has one.
        if lines.last() == Some(&"") {
            let end = lines.len() - 1;
            lines.insert(end, &replacement);
        } else {
            lines.push(&replacement);
        }
    }

    lines.join("\n")
}

/// Extract the value of the first `key=` line, if any
pub fn extract_key(content: &str, key: &str) -> Option<String> {
    let prefix = format!("{key}=");
    content
        .split('\n')
        .find_map(|line| line.strip_prefix(&prefix))
        .map(str::to_string)
}

/// Env-file backed config record accessor
///
/// # Example
///
/// ```rust,no_run
/// use ipsync_core::envfile::EnvFile;
/// use ipsync_core::traits::ConfigRecord;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let record = EnvFile::new("/srv/stack/.env");
///
///     record.write_value("PUBLIC_ADDR", "203.0.113.5").await?;
///     let value = record.read_value("PUBLIC_ADDR").await?;
///     assert_eq!(value.as_deref(), Some("203.0.113.5"));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
}

impl EnvFile {
    /// Create an accessor for the given env file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the underlying record
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole record, treating a missing file as empty
    async fn read_content(&self) -> Result<String, Error> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(Error::io(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Parse every `KEY=VALUE` line of the record
    ///
    /// Used by the daemon at startup to overlay the process
    /// environment. Comment lines and lines without `=` are skipped.
    /// A missing file yields an empty list.
    pub async fn read_all(&self) -> Result<Vec<(String, String)>, Error> {
        let content = self.read_content().await?;
        Ok(content
            .split('\n')
            .filter(|line| !line.trim_start().starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect())
    }

    /// Path of the temporary file used for atomic rewrites
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }
}

#[async_trait]
impl ConfigRecord for EnvFile {
    async fn read_value(&self, key: &str) -> Result<Option<String>, Error> {
        let content = self.read_content().await?;
        Ok(extract_key(&content, key))
    }

    async fn write_value(&self, key: &str, value: &str) -> Result<(), Error> {
        let content = self.read_content().await?;
        let updated = apply_key(&content, key, value);

        // Write to a temporary file first, then rename into place.
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::io(format!(
                    "failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(updated.as_bytes()).await.map_err(|e| {
                Error::io(format!(
                    "failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::io(format!(
                    "failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::io(format!(
                "failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::debug!("config record updated: {}={}", key, value);
        Ok(())
    }
}
