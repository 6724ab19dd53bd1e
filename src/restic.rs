//! Restic CLI client.
//!
//! This module wraps subprocess invocation of the restic binary and parses
//! its output into the exporter's data model. Credentials are passed to the
//! child through its environment, never on the command line, and every
//! invocation is bounded by the configured timeout.

use crate::config::ResticConfig;
use crate::error::{Result, ResticError};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use std::process::Output;
use std::time::Duration;
use tracing::debug;

/// A single backup snapshot parsed from `restic snapshots --json`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Short snapshot id (e.g., "40dc1520")
    pub id: String,
    /// Snapshot creation time
    pub time: DateTime<FixedOffset>,
    /// Host the snapshot was taken on
    pub host: String,
    /// Tags attached to the snapshot
    pub tags: Vec<String>,
    /// Source directory the snapshot was taken from
    pub directory: String,
    /// Snapshot size in bytes (0 when restic does not report one)
    pub size_bytes: u64,
}

impl Snapshot {
    /// Snapshot creation time as a Unix epoch.
    pub fn unix_timestamp(&self) -> i64 {
        self.time.timestamp()
    }
}

/// Outcome of a repository integrity check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckResult {
    /// Whether `restic check` reported a healthy repository
    pub success: bool,
    /// Unix timestamp of the last completed check
    pub checked_at: i64,
}

/// Raw snapshot entry as emitted by restic.
#[derive(Debug, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    id: String,
    #[serde(default)]
    short_id: Option<String>,
    time: DateTime<FixedOffset>,
    hostname: String,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    paths: Vec<String>,
    #[serde(default)]
    summary: Option<RawSummary>,
}

/// Per-snapshot summary block (restic >= 0.17 includes it in listings).
#[derive(Debug, Deserialize)]
struct RawSummary {
    #[serde(default)]
    total_bytes_processed: Option<u64>,
}

impl From<RawSnapshot> for Snapshot {
    fn from(raw: RawSnapshot) -> Self {
        let id = match raw.short_id {
            Some(short) if !short.is_empty() => short,
            _ => raw.id.chars().take(8).collect(),
        };
        Self {
            id,
            time: raw.time,
            host: raw.hostname,
            tags: raw.tags.unwrap_or_default(),
            directory: raw.paths.join(","),
            size_bytes: raw
                .summary
                .and_then(|s| s.total_bytes_processed)
                .unwrap_or(0),
        }
    }
}

/// Parse the JSON array emitted by `restic snapshots --json`.
///
/// One malformed entry fails the whole listing; a refresh cycle is applied
/// in full or not at all.
fn parse_snapshots(stdout: &str) -> Result<Vec<Snapshot>> {
    let raw: Vec<RawSnapshot> = serde_json::from_str(stdout).map_err(|e| {
        ResticError::Parse(format!("invalid snapshot listing: {}", e))
    })?;
    Ok(raw.into_iter().map(Snapshot::from).collect())
}

/// Count lock ids in `restic list locks` output (one id per line).
fn parse_lock_count(stdout: &str) -> u64 {
    stdout.lines().filter(|line| !line.trim().is_empty()).count() as u64
}

/// Client for the restic CLI.
#[derive(Clone)]
pub struct ResticClient {
    config: ResticConfig,
}

impl ResticClient {
    /// Create a new restic client.
    pub fn new(config: ResticConfig) -> Self {
        Self { config }
    }

    /// List all snapshots in the repository.
    pub async fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        let output = self.run(&["--json", "snapshots"]).await?;
        if !output.status.success() {
            return Err(ResticError::Command(format!(
                "snapshots exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let snapshots = parse_snapshots(&stdout)?;
        debug!("Listed {} snapshots", snapshots.len());
        Ok(snapshots)
    }

    /// Run a repository integrity check.
    ///
    /// A check that finds errors is a successful invocation reporting
    /// `false`; only a spawn failure or timeout is an error.
    pub async fn check(&self) -> Result<bool> {
        let output = self.run(&["check"]).await?;
        if !output.status.success() {
            debug!(
                "restic check reported errors: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output.status.success())
    }

    /// Count currently held repository locks.
    pub async fn count_locks(&self) -> Result<u64> {
        let output = self.run(&["list", "locks"]).await?;
        if !output.status.success() {
            return Err(ResticError::Command(format!(
                "list locks exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(parse_lock_count(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Invoke the restic binary with the repository flag and credentials,
    /// bounded by the configured timeout. The child is killed if the
    /// timeout fires.
    async fn run(&self, args: &[&str]) -> Result<Output> {
        debug!("Running {} {:?}", self.config.binary, args);

        let mut command = tokio::process::Command::new(&self.config.binary);
        command
            .arg("-r")
            .arg(&self.config.repository)
            .args(args)
            .env("RESTIC_PASSWORD", &self.config.password)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        if let Some(key) = &self.config.aws_access_key_id {
            command.env("AWS_ACCESS_KEY_ID", key);
        }
        if let Some(secret) = &self.config.aws_secret_access_key {
            command.env("AWS_SECRET_ACCESS_KEY", secret);
        }

        let timeout = Duration::from_secs(self.config.command_timeout_seconds);
        match tokio::time::timeout(timeout, command.output()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ResticError::Timeout(self.config.command_timeout_seconds)),
        }
    }
}
