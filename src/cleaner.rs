//! Cleaner stage: decode the encoded category column into binary flag
//! columns, then drop exact duplicate rows.

use crate::config::EtlConfig;
use crate::constants::{NAME_VALUE_SEPARATOR, TOKEN_SEPARATOR};
use crate::error::{EtlError, Result};
use crate::metrics::CleanerMetrics;
use crate::types::{concat_columns, Column, ColumnType, Row, Schema, Table, Value};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, instrument, warn};

/// What the cleaner did to the table
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanStats {
    /// Decoded category columns, in the order of the first row's tokens
    pub categories: Vec<String>,
    /// Per category, how many raw values above 1 were collapsed to 1
    pub collapsed: BTreeMap<String, usize>,
    pub duplicates_dropped: usize,
}

#[derive(Debug)]
pub struct CleanOutcome {
    pub table: Table,
    pub stats: CleanStats,
}

/// Category names of an encoded string: the text before the first `-` of
/// every `;`-separated token, in order.
pub fn category_names(encoded: &str) -> Vec<String> {
    encoded
        .split(TOKEN_SEPARATOR)
        .map(|token| {
            token
                .split(NAME_VALUE_SEPARATOR)
                .next()
                .unwrap_or(token)
                .to_string()
        })
        .collect()
}

/// Collapse a raw flag to {0, 1}: anything at or above 1 is set
pub fn binarize(raw: i64) -> i64 {
    if raw >= 1 {
        1
    } else {
        0
    }
}

/// Raw value of a token: the text after its last `-`
fn token_value(token: &str) -> &str {
    match token.rsplit_once(NAME_VALUE_SEPARATOR) {
        Some((_, value)) => value,
        None => token,
    }
}

fn encoded_text(value: &Value, row: usize) -> Result<Cow<'_, str>> {
    match value {
        Value::Text(s) => Ok(Cow::Borrowed(s)),
        Value::Integer(i) => Ok(Cow::Owned(i.to_string())),
        Value::Null => Err(EtlError::MissingCategories { row }),
    }
}

/// Replace `column` with one binary `Integer` column per category.
///
/// Category names come from row 0. Every row must carry the same number of
/// tokens; a row that does not is rejected rather than realigned. The new
/// columns are appended after the remaining columns.
pub fn decode_categories(table: Table, column: &str) -> Result<(Table, CleanStats)> {
    let idx = table
        .schema()
        .index_of(column)
        .ok_or_else(|| EtlError::MissingColumn {
            origin: "joined table".to_string(),
            column: column.to_string(),
        })?;

    let names = match table.rows().first() {
        Some(first) => category_names(&encoded_text(&first[idx], 0)?),
        None => {
            warn!("No rows to decode; no category columns derived");
            Vec::new()
        }
    };

    let mut collapsed: BTreeMap<String, usize> = BTreeMap::new();
    let mut flags: Vec<Vec<i64>> = Vec::with_capacity(table.len());
    for (r, row) in table.rows().iter().enumerate() {
        let encoded = encoded_text(&row[idx], r)?;
        let tokens: Vec<&str> = encoded.split(TOKEN_SEPARATOR).collect();
        if tokens.len() != names.len() {
            return Err(EtlError::CategoryMisalignment {
                row: r,
                expected: names.len(),
                found: tokens.len(),
            });
        }

        let mut row_flags = Vec::with_capacity(names.len());
        for (name, token) in names.iter().zip(tokens) {
            let raw = token_value(token);
            let value: i64 = raw.trim().parse().map_err(|_| EtlError::CategoryValue {
                row: r,
                category: name.clone(),
                raw: raw.to_string(),
            })?;
            if value > 1 {
                *collapsed.entry(name.clone()).or_default() += 1;
            }
            row_flags.push(binarize(value));
        }
        flags.push(row_flags);
    }

    let (schema, rows) = table.into_parts();
    let kept: Vec<Column> = schema
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != idx)
        .map(|(_, c)| c.clone())
        .collect();
    let category_columns: Vec<Column> = names
        .iter()
        .map(|n| Column::new(n.clone(), ColumnType::Integer))
        .collect();
    let schema = Schema::try_new(concat_columns(&kept, &category_columns), "decoded table")?;

    let rows: Vec<Row> = rows
        .into_iter()
        .zip(flags)
        .map(|(row, row_flags)| {
            let mut out: Row = row
                .into_iter()
                .enumerate()
                .filter(|(i, _)| *i != idx)
                .map(|(_, v)| v)
                .collect();
            out.extend(row_flags.into_iter().map(Value::Integer));
            out
        })
        .collect();

    let stats = CleanStats {
        categories: names,
        collapsed,
        duplicates_dropped: 0,
    };
    Ok((Table::new(schema, rows), stats))
}

/// Remove rows equal in every column to an earlier row. Returns the table
/// and the number of rows dropped.
pub fn drop_duplicates(table: Table) -> (Table, usize) {
    let (schema, rows) = table.into_parts();
    let before = rows.len();
    let keep: Vec<bool> = {
        let mut seen: HashSet<&Row> = HashSet::with_capacity(before);
        rows.iter().map(|row| seen.insert(row)).collect()
    };
    let rows: Vec<Row> = rows
        .into_iter()
        .zip(keep)
        .filter_map(|(row, first)| first.then_some(row))
        .collect();
    let dropped = before - rows.len();
    (Table::new(schema, rows), dropped)
}

/// Decode the configured category column and deduplicate
#[instrument(skip_all, fields(rows = table.len()))]
pub fn clean_data(table: Table, config: &EtlConfig) -> Result<CleanOutcome> {
    let _timing = CleanerMetrics::duration_guard();

    let (decoded, mut stats) = decode_categories(table, &config.category_column)?;
    CleanerMetrics::record_category_columns(stats.categories.len());
    debug!(categories = ?stats.categories, "Decoded category columns");

    for (category, count) in &stats.collapsed {
        warn!(
            category = %category,
            count,
            "Category values above 1 collapsed to 1"
        );
    }
    CleanerMetrics::record_collapsed_values(stats.collapsed.values().sum());

    let (table, dropped) = drop_duplicates(decoded);
    stats.duplicates_dropped = dropped;
    CleanerMetrics::record_duplicates_dropped(dropped);

    info!(
        rows = table.len(),
        categories = stats.categories.len(),
        duplicates_dropped = dropped,
        "Cleaned table"
    );
    Ok(CleanOutcome { table, stats })
}
