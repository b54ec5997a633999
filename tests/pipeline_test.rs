use anyhow::Result;
use disaster_etl::config::EtlConfig;
use disaster_etl::storage::{SqliteStore, TableStore};
use disaster_etl::types::Value;
use disaster_etl::{EtlError, Pipeline, PipelineInputs};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn inputs_in(dir: &Path, messages: &str, categories: &str) -> Result<PipelineInputs> {
    let inputs = PipelineInputs {
        messages: dir.join("disaster_messages.csv"),
        categories: dir.join("disaster_categories.csv"),
        database: dir.join("DisasterResponse.db"),
    };
    fs::write(&inputs.messages, messages)?;
    fs::write(&inputs.categories, categories)?;
    Ok(inputs)
}

#[test]
fn test_single_message_end_to_end() -> Result<()> {
    let dir = tempdir()?;
    let inputs = inputs_in(
        dir.path(),
        "id,message\n1,flood\n",
        "id,categories\n1,related-1;offer-0;aid-2\n",
    )?;
    let config = EtlConfig::default();

    let report = Pipeline::new(&config).run(&inputs)?;
    assert_eq!(report.rows_written, 1);

    let store = SqliteStore::open(&inputs.database)?;
    let table = store.load_table("Message")?.expect("Message table written");
    assert_eq!(
        table.schema().names(),
        vec!["id", "message", "related", "offer", "aid"]
    );
    assert_eq!(
        table.rows(),
        &[vec![
            Value::Integer(1),
            Value::from("flood"),
            Value::Integer(1),
            Value::Integer(0),
            Value::Integer(1),
        ]]
    );
    Ok(())
}

#[test]
fn test_realistic_columns_and_duplicates() -> Result<()> {
    let dir = tempdir()?;
    let messages = "id,message,original,genre\n\
        2,Weather update - a cold front,Un front froid,direct\n\
        7,\"Is the Hurricane over, or is it not?\",,direct\n\
        7,\"Is the Hurricane over, or is it not?\",,direct\n\
        12,says: west side of Haiti,facade ouest,direct\n";
    let categories = "id,categories\n\
        2,related-1;request-0;offer-0;aid_related-0\n\
        7,related-2;request-0;offer-0;aid_related-1\n\
        7,related-2;request-0;offer-0;aid_related-1\n\
        14,related-1;request-1;offer-0;aid_related-1\n";
    let inputs = inputs_in(dir.path(), messages, categories)?;
    let config = EtlConfig::default();

    let report = Pipeline::new(&config).run(&inputs)?;
    // id 7 appears twice on each side: 4 joined rows, all identical after decoding
    assert_eq!(report.joined_rows, 5);
    assert_eq!(report.duplicates_dropped, 3);
    assert_eq!(report.rows_written, 2);
    assert_eq!(report.collapsed_values.get("related"), Some(&4));

    let table = SqliteStore::open(&inputs.database)?
        .load_table("Message")?
        .expect("Message table written");
    let ids: Vec<i64> = table
        .column_values("id")
        .unwrap()
        .into_iter()
        .filter_map(|v| v.as_integer())
        .collect();
    assert_eq!(ids, vec![2, 7]);
    assert_eq!(table.value(1, "original"), Some(&Value::Null));
    assert_eq!(table.value(1, "related"), Some(&Value::Integer(1)));
    Ok(())
}

#[test]
fn test_rerun_replaces_table() -> Result<()> {
    let dir = tempdir()?;
    let inputs = inputs_in(
        dir.path(),
        "id,message\n1,flood\n2,fire\n",
        "id,categories\n1,related-1\n2,related-0\n",
    )?;
    let config = EtlConfig::default();

    Pipeline::new(&config).run(&inputs)?;
    let first = SqliteStore::open(&inputs.database)?.load_table("Message")?;
    Pipeline::new(&config).run(&inputs)?;
    let second = SqliteStore::open(&inputs.database)?.load_table("Message")?;

    assert_eq!(first, second);
    assert_eq!(second.map(|t| t.len()), Some(2));
    Ok(())
}

#[test]
fn test_rerun_with_different_shape_drops_old_columns() -> Result<()> {
    let dir = tempdir()?;
    let config = EtlConfig::default();

    let inputs = inputs_in(dir.path(), "id,message\n1,a\n", "id,categories\n1,old-1\n")?;
    Pipeline::new(&config).run(&inputs)?;

    let inputs = inputs_in(dir.path(), "id,message\n1,a\n", "id,categories\n1,new-0\n")?;
    Pipeline::new(&config).run(&inputs)?;

    let table = SqliteStore::open(&inputs.database)?
        .load_table("Message")?
        .expect("Message table written");
    assert_eq!(table.schema().names(), vec!["id", "message", "new"]);
    Ok(())
}

#[test]
fn test_empty_join_writes_empty_table() -> Result<()> {
    let dir = tempdir()?;
    let inputs = inputs_in(
        dir.path(),
        "id,message\n1,flood\n",
        "id,categories\n2,related-1\n",
    )?;
    let config = EtlConfig::default();

    let report = Pipeline::new(&config).run(&inputs)?;
    assert_eq!(report.joined_rows, 0);
    assert!(report.category_columns.is_empty());

    let table = SqliteStore::open(&inputs.database)?
        .load_table("Message")?
        .expect("Message table written");
    assert!(table.is_empty());
    assert_eq!(table.schema().names(), vec!["id", "message"]);
    Ok(())
}

#[test]
fn test_misaligned_categories_abort_before_writing() -> Result<()> {
    let dir = tempdir()?;
    let inputs = inputs_in(
        dir.path(),
        "id,message\n1,a\n2,b\n",
        "id,categories\n1,related-1;offer-0\n2,related-1\n",
    )?;
    let config = EtlConfig::default();

    let err = Pipeline::new(&config).run(&inputs).unwrap_err();
    assert!(matches!(
        err,
        EtlError::CategoryMisalignment { row: 1, expected: 2, found: 1 }
    ));
    assert!(!inputs.database.exists());
    Ok(())
}

#[test]
fn test_custom_table_name() -> Result<()> {
    let dir = tempdir()?;
    let inputs = inputs_in(dir.path(), "id,message\n1,a\n", "id,categories\n1,x-1\n")?;
    let config = EtlConfig {
        table_name: "Cleaned".to_string(),
        ..EtlConfig::default()
    };

    Pipeline::new(&config).run(&inputs)?;
    let store = SqliteStore::open(&inputs.database)?;
    assert!(store.table_exists("Cleaned")?);
    assert!(!store.table_exists("Message")?);
    Ok(())
}
