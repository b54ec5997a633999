//! Cleaner phase metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct CleanerMetrics;

impl CleanerMetrics {
    pub fn record_category_columns(count: usize) {
        ::metrics::gauge!(phase_metric!(gauge, "cleaner", "category_columns")).set(count as f64);
    }

    /// Raw values greater than 1 that were binarized to 1
    pub fn record_collapsed_values(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "cleaner", "values_collapsed"))
            .increment(count as u64);
    }

    pub fn record_duplicates_dropped(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "cleaner", "duplicates_dropped"))
            .increment(count as u64);
    }

    pub fn duration_guard() -> crate::metrics::core::TimingGuard {
        crate::metrics::core::time_operation(phase_metric!(
            histogram,
            "cleaner",
            "duration_seconds"
        ))
    }
}

impl PhaseMetrics for CleanerMetrics {
    fn register_metrics() {
        let _ = ::metrics::gauge!(phase_metric!(gauge, "cleaner", "category_columns"));
        let _ = ::metrics::counter!(phase_metric!(counter, "cleaner", "values_collapsed"));
        let _ = ::metrics::counter!(phase_metric!(counter, "cleaner", "duplicates_dropped"));
        let _ = ::metrics::histogram!(phase_metric!(histogram, "cleaner", "duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "cleaner"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(gauge, "cleaner", "category_columns"),
                metric_type: MetricType::Gauge,
                help: "Category columns decoded from the first row",
            },
            MetricDoc {
                name: phase_metric!(counter, "cleaner", "values_collapsed"),
                metric_type: MetricType::Counter,
                help: "Category values above 1 collapsed to 1",
            },
            MetricDoc {
                name: phase_metric!(counter, "cleaner", "duplicates_dropped"),
                metric_type: MetricType::Counter,
                help: "Exact duplicate rows removed",
            },
            MetricDoc {
                name: phase_metric!(histogram, "cleaner", "duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Time spent decoding and deduplicating",
            },
        ]
    }
}
