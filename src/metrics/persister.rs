//! Persister phase metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct PersisterMetrics;

impl PersisterMetrics {
    pub fn record_rows_written(rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "persister", "rows_written"))
            .increment(rows as u64);
    }

    pub fn record_table_replaced() {
        ::metrics::counter!(phase_metric!(counter, "persister", "tables_replaced")).increment(1);
    }

    pub fn duration_guard() -> crate::metrics::core::TimingGuard {
        crate::metrics::core::time_operation(phase_metric!(
            histogram,
            "persister",
            "duration_seconds"
        ))
    }
}

impl PhaseMetrics for PersisterMetrics {
    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "persister", "rows_written"));
        let _ = ::metrics::counter!(phase_metric!(counter, "persister", "tables_replaced"));
        let _ = ::metrics::histogram!(phase_metric!(histogram, "persister", "duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "persister"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "persister", "rows_written"),
                metric_type: MetricType::Counter,
                help: "Rows inserted into the destination table",
            },
            MetricDoc {
                name: phase_metric!(counter, "persister", "tables_replaced"),
                metric_type: MetricType::Counter,
                help: "Destination tables dropped and recreated",
            },
            MetricDoc {
                name: phase_metric!(histogram, "persister", "duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Time spent writing the destination table",
            },
        ]
    }
}
