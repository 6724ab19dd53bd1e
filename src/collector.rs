//! Refresh cycle driving the published metrics state.
//!
//! A single background task invokes the restic CLI on a fixed interval,
//! builds a complete [`MetricsSnapshot`], renders it, and swaps the
//! published state atomically. Any failure along the way leaves the
//! previously published state untouched (stale-but-available).

use crate::error::Result;
use crate::metrics::MetricsSnapshot;
use crate::restic::{CheckResult, ResticClient, Snapshot};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{error, info, warn};

/// One completed refresh cycle: the parsed data and its rendered
/// text exposition. Rendering happens once per cycle, so every scrape of
/// the same cycle returns an identical body.
#[derive(Debug)]
pub struct Published {
    /// Parsed state of the cycle
    pub data: MetricsSnapshot,
    /// Prometheus text exposition of `data`
    pub body: String,
}

impl Published {
    fn from_snapshot(data: MetricsSnapshot) -> Result<Self> {
        let body = data.render()?;
        Ok(Self { data, body })
    }
}

/// Drop snapshots whose published identity (short id, epoch, host, tags,
/// directory, size) collides with an earlier one. Two such snapshots would
/// collapse into a single series, leaving fewer detail samples than the
/// published count.
fn dedup_snapshots(snapshots: Vec<Snapshot>) -> Vec<Snapshot> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(snapshots.len());
    for snapshot in snapshots {
        let key = (
            snapshot.id.clone(),
            snapshot.unix_timestamp(),
            snapshot.host.clone(),
            snapshot.tags.join(","),
            snapshot.directory.clone(),
            snapshot.size_bytes,
        );
        if seen.insert(key) {
            unique.push(snapshot);
        } else {
            warn!(
                "Dropping snapshot {} with duplicate identity on host {}",
                snapshot.id, snapshot.host
            );
        }
    }
    unique
}

/// Owns the published metrics state and refreshes it from restic.
pub struct Collector {
    client: ResticClient,
    current: RwLock<Arc<Published>>,
}

impl Collector {
    /// Create a collector with an empty initial state.
    pub fn new(client: ResticClient) -> Result<Self> {
        let initial = Published::from_snapshot(MetricsSnapshot::default())?;
        Ok(Self {
            client,
            current: RwLock::new(Arc::new(initial)),
        })
    }

    /// The currently published state. Cheap; never blocks a refresh for
    /// longer than the pointer swap itself.
    pub fn current(&self) -> Arc<Published> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Run one refresh cycle and swap the published state.
    ///
    /// All three restic invocations must succeed before anything is
    /// published; a failed cycle changes nothing.
    pub async fn refresh(&self) -> Result<()> {
        let snapshots = dedup_snapshots(self.client.list_snapshots().await?);
        let check_success = self.client.check().await?;
        let locks = self.client.count_locks().await?;

        let data = MetricsSnapshot {
            snapshots,
            check: CheckResult {
                success: check_success,
                checked_at: Utc::now().timestamp(),
            },
            locks,
        };

        info!(
            snapshots = data.snapshots.len(),
            check_success, locks, "Refreshed metrics from restic"
        );

        let published = Arc::new(Published::from_snapshot(data)?);
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = published;

        Ok(())
    }

    /// Drive `refresh` on a fixed interval until the process exits.
    ///
    /// The interval must be non-zero; configuration validation rejects a
    /// zero refresh interval at startup.
    ///
    /// The first cycle runs immediately. Failures are logged and the
    /// previous state stays visible to scrapers.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh().await {
                error!("Refresh failed, keeping previous metrics: {}", e);
            }
        }
    }
}
