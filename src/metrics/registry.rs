//! Registration of all phase metrics with conflict detection

use crate::metrics::{MetricDoc, MetricType, PhaseMetrics};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Register every phase, logging any name claimed by two phases
pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();

    register_phase_metrics::<super::loader::LoaderMetrics>(&mut all_metrics);
    register_phase_metrics::<super::cleaner::CleanerMetrics>(&mut all_metrics);
    register_phase_metrics::<super::persister::PersisterMetrics>(&mut all_metrics);

    debug!(
        "Registered {} total metrics across all phases",
        all_metrics.len()
    );
}

/// Register one phase and attach each metric's help text to the recorder.
///
/// Returns the names that an earlier phase had already claimed.
pub(crate) fn register_phase_metrics<T: PhaseMetrics>(
    all_metrics: &mut HashMap<&'static str, (&'static str, MetricDoc)>,
) -> Vec<&'static str> {
    T::register_metrics();
    let phase_name = T::phase_name();
    let mut conflicts = Vec::new();

    for doc in T::metrics_documentation() {
        match doc.metric_type {
            MetricType::Counter => ::metrics::describe_counter!(doc.name, doc.help),
            MetricType::Histogram => ::metrics::describe_histogram!(doc.name, doc.help),
            MetricType::Gauge => ::metrics::describe_gauge!(doc.name, doc.help),
        }
        if let Some((owner, _)) = all_metrics.get(doc.name) {
            warn!(
                "Metric name conflict: '{}' is defined by phase '{}' and phase '{}'",
                doc.name, owner, phase_name
            );
            conflicts.push(doc.name);
        } else {
            all_metrics.insert(doc.name, (phase_name, doc));
        }
    }
    conflicts
}
