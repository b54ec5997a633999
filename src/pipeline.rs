//! Orchestration of a single ETL run
//!
//! [`Pipeline`] runs the three stages in order and owns nothing but a borrow
//! of the configuration:
//!
//! 1. load: read both sources and inner-join them ([`crate::loader`])
//! 2. clean: decode categories and drop duplicates ([`crate::cleaner`])
//! 3. persist: replace the destination table ([`crate::storage`])
//!
//! Every stage consumes the previous stage's output in full. Any error ends
//! the run; nothing is retried. The run is summarized in a
//! [`PipelineReport`], which the CLI can write out as JSON.

use crate::cleaner::{clean_data, CleanStats};
use crate::config::EtlConfig;
use crate::error::Result;
use crate::loader::load_data;
use crate::storage::{persist, SqliteStore, TableStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use uuid::Uuid;

/// Input and output locations for one run
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub messages: PathBuf,
    pub categories: PathBuf,
    pub database: PathBuf,
}

impl PipelineInputs {
    /// Accept exactly three positional values (messages, categories,
    /// database); any other count yields `None`.
    pub fn from_positionals(args: &[String]) -> Option<Self> {
        match args {
            [messages, categories, database] => Some(Self {
                messages: PathBuf::from(messages),
                categories: PathBuf::from(categories),
                database: PathBuf::from(database),
            }),
            _ => None,
        }
    }
}

/// Summary of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub messages_rows: usize,
    pub categories_rows: usize,
    pub joined_rows: usize,
    pub category_columns: Vec<String>,
    pub collapsed_values: BTreeMap<String, usize>,
    pub duplicates_dropped: usize,
    pub rows_written: usize,
    pub table_name: String,
    pub destination: String,
    /// Prometheus text snapshot of the phase metrics, when a recorder is live
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<String>,
}

impl PipelineReport {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

pub struct Pipeline<'a> {
    config: &'a EtlConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a EtlConfig) -> Self {
        Self { config }
    }

    /// Load, clean and save into the SQLite database named by `inputs`
    pub fn run(&self, inputs: &PipelineInputs) -> Result<PipelineReport> {
        let (report, _store) = self.run_with(inputs, || SqliteStore::open(&inputs.database))?;
        Ok(report)
    }

    /// Run Loader → Cleaner → Persister. The store is opened only once the
    /// table is clean, so a failed load or clean leaves the destination
    /// untouched. Returns the report and the store.
    #[instrument(skip_all, fields(table = %self.config.table_name))]
    pub fn run_with<S, F>(
        &self,
        inputs: &PipelineInputs,
        open_store: F,
    ) -> Result<(PipelineReport, S)>
    where
        S: TableStore,
        F: FnOnce() -> Result<S>,
    {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, "Starting pipeline");

        println!(
            "Loading data...\n    MESSAGES: {}\n    CATEGORIES: {}",
            inputs.messages.display(),
            inputs.categories.display()
        );
        let loaded = load_data(&inputs.messages, &inputs.categories, self.config)?;
        let joined_rows = loaded.table.len();

        println!("Cleaning data...");
        let cleaned = clean_data(loaded.table, self.config)?;
        let CleanStats {
            categories,
            collapsed,
            duplicates_dropped,
        } = cleaned.stats;

        println!("Saving data...\n    DATABASE: {}", inputs.database.display());
        let mut store = open_store()?;
        persist(&mut store, &cleaned.table, &self.config.table_name)?;

        println!("Cleaned data saved to database!");

        let report = PipelineReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            messages_rows: loaded.messages_rows,
            categories_rows: loaded.categories_rows,
            joined_rows,
            category_columns: categories,
            collapsed_values: collapsed,
            duplicates_dropped,
            rows_written: cleaned.table.len(),
            table_name: self.config.table_name.clone(),
            destination: inputs.database.display().to_string(),
            metrics: crate::metrics::render_snapshot(),
        };
        info!(
            %run_id,
            joined_rows = report.joined_rows,
            rows_written = report.rows_written,
            duplicates_dropped = report.duplicates_dropped,
            "Pipeline finished"
        );
        Ok((report, store))
    }
}
