//! # Restic Exporter
//!
//! A Prometheus metrics exporter for restic backup repositories.
//!
//! ## Overview
//!
//! The exporter periodically invokes the restic CLI, parses its output,
//! and republishes the results as Prometheus gauges:
//!
//! - Total snapshot count
//! - Per-snapshot details (id, date, host, tags, directory, size)
//! - Repository integrity check result
//! - Currently held repository locks
//!
//! A single background task refreshes the published state on a fixed
//! interval; scrapes read the state without blocking the refresh, and a
//! failed refresh leaves the previously published state visible.
//!
//! ## Quick Start
//!
//! ```no_run
//! use restic_exporter::{
//!     collector::Collector, config::Settings, restic::ResticClient, server::start_server,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load(Some("config/default.toml"))?;
//!
//!     let client = ResticClient::new(settings.restic.clone());
//!     let collector = Arc::new(Collector::new(client)?);
//!
//!     tokio::spawn(Arc::clone(&collector).run(Duration::from_secs(
//!         settings.exporter.refresh_interval_seconds,
//!     )));
//!
//!     start_server(&settings.exporter.listen_address, collector).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! The exporter can be configured via:
//! - TOML configuration file
//! - Environment variables (with `RESTIC_EXPORTER_` prefix)
//! - Command-line arguments
//!
//! See [`config::Settings`] for details.
//!
//! ## Modules
//!
//! - [`restic`] - restic CLI client and output parsing
//! - [`collector`] - refresh cycle and published state
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling
//! - [`metrics`] - Prometheus metrics definitions and rendering
//! - [`server`] - HTTP server for exposing metrics

pub mod collector;
pub mod config;
pub mod error;
pub mod metrics;
pub mod restic;
pub mod server;

pub use error::{Result, ResticError};
