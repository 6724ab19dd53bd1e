//! Prometheus metrics definitions and rendering.
//!
//! This module defines the published metrics state and renders it to the
//! Prometheus text exposition format. Rendering builds a fresh registry
//! from one [`MetricsSnapshot`], so a single response can never mix data
//! from two refresh cycles.

use crate::error::{Result, ResticError};
use crate::restic::{CheckResult, Snapshot};
use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

// Interned label fallbacks to avoid repeated allocations
const UNKNOWN: &str = "unknown";
const NO_TAGS: &str = "none";

/// The complete published state of one refresh cycle.
///
/// Owned by the collector and replaced atomically after each successful
/// refresh; readers never observe a partially updated set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    /// All snapshots in the repository, in listing order
    pub snapshots: Vec<Snapshot>,
    /// Result of the repository integrity check
    pub check: CheckResult,
    /// Number of currently held repository locks
    pub locks: u64,
}

impl MetricsSnapshot {
    /// Render this state in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String> {
        let registry = Registry::new();

        let snapshot_count = Gauge::with_opts(Opts::new(
            "restic_snapshot_count",
            "Number of restic snapshots",
        ))
        .map_err(|e| ResticError::Metrics(e.to_string()))?;
        registry
            .register(Box::new(snapshot_count.clone()))
            .map_err(|e| ResticError::Metrics(e.to_string()))?;

        let snapshot_details = GaugeVec::new(
            Opts::new(
                "restic_snapshot_details",
                "Details of each restic snapshot, with size in bytes as value",
            ),
            &["id", "date", "host", "tags", "directory", "size"],
        )
        .map_err(|e| ResticError::Metrics(e.to_string()))?;
        registry
            .register(Box::new(snapshot_details.clone()))
            .map_err(|e| ResticError::Metrics(e.to_string()))?;

        let snapshot_timestamp = GaugeVec::new(
            Opts::new(
                "restic_snapshot_timestamp",
                "Unix timestamp of each restic snapshot",
            ),
            &["host", "id", "date"],
        )
        .map_err(|e| ResticError::Metrics(e.to_string()))?;
        registry
            .register(Box::new(snapshot_timestamp.clone()))
            .map_err(|e| ResticError::Metrics(e.to_string()))?;

        let check_success = Gauge::with_opts(Opts::new(
            "restic_check_success",
            "Whether the last repository check succeeded (1 = success, 0 = failure)",
        ))
        .map_err(|e| ResticError::Metrics(e.to_string()))?;
        registry
            .register(Box::new(check_success.clone()))
            .map_err(|e| ResticError::Metrics(e.to_string()))?;

        let locks_total = Gauge::with_opts(Opts::new(
            "restic_locks_total",
            "Number of currently held repository locks",
        ))
        .map_err(|e| ResticError::Metrics(e.to_string()))?;
        registry
            .register(Box::new(locks_total.clone()))
            .map_err(|e| ResticError::Metrics(e.to_string()))?;

        snapshot_count.set(self.snapshots.len() as f64);

        for snapshot in &self.snapshots {
            let date = snapshot.unix_timestamp().to_string();
            let size = snapshot.size_bytes.to_string();
            let tags = if snapshot.tags.is_empty() {
                NO_TAGS.to_string()
            } else {
                snapshot.tags.join(",")
            };
            let host = if snapshot.host.is_empty() {
                UNKNOWN
            } else {
                snapshot.host.as_str()
            };
            let directory = if snapshot.directory.is_empty() {
                UNKNOWN
            } else {
                snapshot.directory.as_str()
            };

            snapshot_details
                .with_label_values(&[
                    snapshot.id.as_str(),
                    date.as_str(),
                    host,
                    tags.as_str(),
                    directory,
                    size.as_str(),
                ])
                .set(snapshot.size_bytes as f64);

            snapshot_timestamp
                .with_label_values(&[host, snapshot.id.as_str(), date.as_str()])
                .set(snapshot.unix_timestamp() as f64);
        }

        check_success.set(if self.check.success { 1.0 } else { 0.0 });
        locks_total.set(self.locks as f64);

        let encoder = TextEncoder::new();
        let mut buffer = Vec::with_capacity(4096);
        encoder
            .encode(&registry.gather(), &mut buffer)
            .map_err(|e| ResticError::Metrics(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| ResticError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn fixture_snapshot(
        id: &str,
        time: &str,
        host: &str,
        tags: &[&str],
        directory: &str,
        size_bytes: u64,
    ) -> Snapshot {
        Snapshot {
            id: id.to_string(),
            time: DateTime::parse_from_rfc3339(time).unwrap(),
            host: host.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            directory: directory.to_string(),
            size_bytes,
        }
    }

    fn fixture() -> MetricsSnapshot {
        MetricsSnapshot {
            snapshots: vec![
                fixture_snapshot(
                    "40dc1520",
                    "2024-11-07T16:26:17+01:00",
                    "alpha",
                    &["nightly", "etc"],
                    "/etc",
                    3671186,
                ),
                fixture_snapshot(
                    "79766175",
                    "2024-11-08T02:00:00+01:00",
                    "beta",
                    &[],
                    "/home",
                    1073741824,
                ),
            ],
            check: CheckResult {
                success: true,
                checked_at: 1731027600,
            },
            locks: 0,
        }
    }

    #[test]
    fn test_render_fixture_exact_lines() {
        let rendered = fixture().render().unwrap();

        assert!(rendered.contains("# TYPE restic_snapshot_count gauge"));
        assert!(rendered.contains("restic_snapshot_count 2"));
        assert!(rendered.contains("restic_check_success 1"));
        assert!(rendered.contains("restic_locks_total 0"));

        // Label pairs are emitted in name order by the text encoder
        assert!(rendered.contains(
            r#"restic_snapshot_details{date="1730993177",directory="/etc",host="alpha",id="40dc1520",size="3671186",tags="nightly,etc"} 3671186"#
        ));
        assert!(rendered.contains(
            r#"restic_snapshot_details{date="1731027600",directory="/home",host="beta",id="79766175",size="1073741824",tags="none"} 1073741824"#
        ));

        assert!(rendered.contains(
            r#"restic_snapshot_timestamp{date="1730993177",host="alpha",id="40dc1520"} 1730993177"#
        ));
    }

    #[test]
    fn test_detail_sample_count_matches_snapshot_count() {
        let state = fixture();
        let rendered = state.render().unwrap();
        let detail_samples = rendered
            .lines()
            .filter(|l| l.starts_with("restic_snapshot_details{"))
            .count();
        assert_eq!(detail_samples, state.snapshots.len());
        assert!(rendered.contains(&format!("restic_snapshot_count {}", state.snapshots.len())));
    }

    #[test]
    fn test_render_empty_state() {
        let rendered = MetricsSnapshot::default().render().unwrap();
        assert!(rendered.contains("restic_snapshot_count 0"));
        assert!(rendered.contains("restic_check_success 0"));
        assert!(rendered.contains("restic_locks_total 0"));
        assert!(!rendered.contains("restic_snapshot_details{"));
    }

    #[test]
    fn test_render_failed_check_and_locks() {
        let state = MetricsSnapshot {
            snapshots: Vec::new(),
            check: CheckResult {
                success: false,
                checked_at: 1731027600,
            },
            locks: 3,
        };
        let rendered = state.render().unwrap();
        assert!(rendered.contains("restic_check_success 0"));
        assert!(rendered.contains("restic_locks_total 3"));
    }

    #[test]
    fn test_render_fallback_labels() {
        let state = MetricsSnapshot {
            snapshots: vec![fixture_snapshot(
                "deadbeef",
                "2024-11-07T00:00:00Z",
                "",
                &[],
                "",
                0,
            )],
            check: CheckResult::default(),
            locks: 0,
        };
        let rendered = state.render().unwrap();
        assert!(rendered.contains(r#"host="unknown""#));
        assert!(rendered.contains(r#"directory="unknown""#));
        assert!(rendered.contains(r#"tags="none""#));
    }
}
