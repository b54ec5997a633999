//! Loader phase metrics: rows parsed per source and rows surviving the join

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct LoaderMetrics;

impl LoaderMetrics {
    pub fn record_source_rows(rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "loader", "rows_read")).increment(rows as u64);
    }

    pub fn record_joined_rows(rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "loader", "rows_joined"))
            .increment(rows as u64);
    }

    pub fn duration_guard() -> crate::metrics::core::TimingGuard {
        crate::metrics::core::time_operation(phase_metric!(histogram, "loader", "duration_seconds"))
    }
}

impl PhaseMetrics for LoaderMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "loader", "rows_read"));
        let _ = ::metrics::counter!(phase_metric!(counter, "loader", "rows_joined"));
        let _ = ::metrics::histogram!(phase_metric!(histogram, "loader", "duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "loader"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "loader", "rows_read"),
                metric_type: MetricType::Counter,
                help: "Rows parsed from the input files",
            },
            MetricDoc {
                name: phase_metric!(counter, "loader", "rows_joined"),
                metric_type: MetricType::Counter,
                help: "Rows produced by the inner join",
            },
            MetricDoc {
                name: phase_metric!(histogram, "loader", "duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Time spent reading and joining the sources",
            },
        ]
    }
}
