//! Loader stage: parse both delimited sources and inner-join them on the key

use crate::config::EtlConfig;
use crate::error::{EtlError, Result};
use crate::metrics::LoaderMetrics;
use crate::types::{concat_columns, Column, ColumnType, Row, Schema, Table, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Joined table plus the sizes of the sources it came from
#[derive(Debug)]
pub struct LoadOutcome {
    pub table: Table,
    pub messages_rows: usize,
    pub categories_rows: usize,
}

/// Parse a delimited text file with a header row into a typed table
pub fn read_delimited(path: &Path, delimiter: u8) -> Result<Table> {
    let file = File::open(path)?;
    read_delimited_from(file, delimiter, &path.display().to_string())
}

/// Same as [`read_delimited`] over any reader; `origin` names the source in
/// error messages.
///
/// Records shorter than the header are padded with `Null`; records longer
/// than the header are rejected with the offending line number.
pub fn read_delimited_from<R: io::Read>(reader: R, delimiter: u8, origin: &str) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let width = headers.len();

    let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.len() > width {
            return Err(EtlError::TooManyFields {
                origin: origin.to_string(),
                line: record.position().map(|p| p.line()).unwrap_or_default(),
                expected: width,
                found: record.len(),
            });
        }
        let mut raw: Vec<Option<String>> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    None
                } else {
                    Some(field.to_string())
                }
            })
            .collect();
        raw.resize(width, None);
        raw_rows.push(raw);
    }

    let types: Vec<ColumnType> = (0..headers.len())
        .map(|j| infer_column_type(raw_rows.iter().map(|r| r[j].as_deref())))
        .collect();

    let columns = headers
        .into_iter()
        .zip(types.iter())
        .map(|(name, t)| Column::new(name, *t))
        .collect();
    let schema = Schema::try_new(columns, origin)?;

    let rows = raw_rows
        .into_iter()
        .map(|raw| {
            raw.into_iter()
                .zip(types.iter())
                .map(|(field, t)| to_value(field, *t))
                .collect()
        })
        .collect();

    debug!(origin, columns = schema.len(), "Parsed delimited source");
    Ok(Table::new(schema, rows))
}

/// `Integer` iff there is at least one value and every value parses as i64
fn infer_column_type<'a, I>(values: I) -> ColumnType
where
    I: Iterator<Item = Option<&'a str>>,
{
    let mut saw_value = false;
    for v in values.flatten() {
        saw_value = true;
        if v.parse::<i64>().is_err() {
            return ColumnType::Text;
        }
    }
    if saw_value {
        ColumnType::Integer
    } else {
        ColumnType::Text
    }
}

fn to_value(field: Option<String>, column_type: ColumnType) -> Value {
    match (field, column_type) {
        (None, _) => Value::Null,
        // Type inference already checked every value in the column
        (Some(s), ColumnType::Integer) => match s.parse() {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Text(s),
        },
        (Some(s), ColumnType::Text) => Value::Text(s),
    }
}

/// Inner join on `key`.
///
/// Output rows follow `left` order; a key with several matches on the right
/// yields one row per match in right order. `Null` keys never match. The key
/// column appears once, at its left position; right columns follow.
pub fn inner_join(
    left: &Table,
    right: &Table,
    key: &str,
    left_origin: &str,
    right_origin: &str,
) -> Result<Table> {
    let left_key = left.schema().index_of(key).ok_or_else(|| EtlError::MissingColumn {
        origin: left_origin.to_string(),
        column: key.to_string(),
    })?;
    let right_key = right.schema().index_of(key).ok_or_else(|| EtlError::MissingColumn {
        origin: right_origin.to_string(),
        column: key.to_string(),
    })?;

    let left_type = left.schema().columns()[left_key].column_type;
    let right_type = right.schema().columns()[right_key].column_type;
    if left_type != right_type {
        return Err(EtlError::JoinKeyType {
            key: key.to_string(),
            left: left_type,
            right: right_type,
        });
    }

    let right_columns: Vec<Column> = right
        .schema()
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != right_key)
        .map(|(_, c)| c.clone())
        .collect();
    let schema = Schema::try_new(
        concat_columns(left.schema().columns(), &right_columns),
        "joined table",
    )?;

    let mut index: HashMap<&Value, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        if !row[right_key].is_null() {
            index.entry(&row[right_key]).or_default().push(i);
        }
    }

    let mut rows: Vec<Row> = Vec::new();
    for row in left.rows() {
        let k = &row[left_key];
        // SQL semantics: a missing key joins nothing (pandas would pair NaN with NaN)
        if k.is_null() {
            continue;
        }
        let Some(matches) = index.get(k) else {
            continue;
        };
        for &ri in matches {
            let mut joined = row.clone();
            joined.extend(
                right.rows()[ri]
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != right_key)
                    .map(|(_, v)| v.clone()),
            );
            rows.push(joined);
        }
    }

    Ok(Table::new(schema, rows))
}

/// Read the messages and categories files and inner-join them on the
/// configured key
#[instrument(skip_all, fields(messages = %messages.display(), categories = %categories.display()))]
pub fn load_data(messages: &Path, categories: &Path, config: &EtlConfig) -> Result<LoadOutcome> {
    let _timing = LoaderMetrics::duration_guard();

    let delimiter = config.delimiter_byte()?;
    let messages_table = read_delimited(messages, delimiter)?;
    let categories_table = read_delimited(categories, delimiter)?;
    LoaderMetrics::record_source_rows(messages_table.len() + categories_table.len());

    let table = inner_join(
        &messages_table,
        &categories_table,
        &config.join_key,
        &messages.display().to_string(),
        &categories.display().to_string(),
    )?;
    LoaderMetrics::record_joined_rows(table.len());

    info!(
        messages_rows = messages_table.len(),
        categories_rows = categories_table.len(),
        joined_rows = table.len(),
        "Joined sources on '{}'",
        config.join_key
    );
    if table.is_empty() {
        warn!("Join produced no rows; continuing with an empty table");
    }

    Ok(LoadOutcome {
        messages_rows: messages_table.len(),
        categories_rows: categories_table.len(),
        table,
    })
}
