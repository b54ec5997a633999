//! Phase-organized metrics for the ETL pipeline
//!
//! Each stage (loader, cleaner, persister) owns a submodule that records its
//! counters and histograms under the `etl_{phase}_{name}` convention.
//!
//! [`init_metrics`] installs a Prometheus recorder without an HTTP listener
//! and keeps its handle, so a short-lived run can render its own snapshot
//! with [`render_snapshot`] into the log and the run report.

pub mod cleaner;
pub mod core;
pub mod loader;
pub mod persister;
pub mod registry;

pub use cleaner::CleanerMetrics;
pub use loader::LoaderMetrics;
pub use persister::PersisterMetrics;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::{Once, OnceLock};
use tracing::{debug, warn};

static INIT: Once = Once::new();
static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global recorder and register every phase's metrics.
///
/// Idempotent. If another recorder is already installed the metrics still
/// register against it, but [`render_snapshot`] returns `None`.
pub fn init_metrics() {
    INIT.call_once(|| {
        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                if HANDLE.set(handle).is_err() {
                    warn!("Prometheus handle already stored");
                }
                debug!("Prometheus recorder installed");
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
            }
        }
        registry::register_all_metrics();
    });
}

/// Current metric values in Prometheus text format, if our recorder is live
pub fn render_snapshot() -> Option<String> {
    HANDLE.get().map(|handle| handle.render())
}

/// Implemented by each phase's metrics collection
pub trait PhaseMetrics {
    /// Pre-register all metrics for this phase
    fn register_metrics();

    fn phase_name() -> &'static str;

    /// Documentation for every metric in this phase, used for conflict checks
    fn metrics_documentation() -> Vec<MetricDoc>;
}

#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
    Gauge,
}

/// Build a phase metric name following `etl_{phase}_{name}[_total]`
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("etl_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("etl_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("etl_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;
