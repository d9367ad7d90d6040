//! Ordered list of additive migrations.
//!
//! `PRAGMA user_version` records the last applied step. Every step also checks
//! the live columns before altering anything, so stores written by older
//! layouts (version 0 but with some columns already present) upgrade cleanly.
//! Migrations only ever add tables, columns or indexes.

use std::collections::HashSet;

use rusqlite::{Connection, Transaction};

use super::util::map_sql_error;
use super::{StoreError, detail_column, flag_columns};
use crate::annotations::labels::detail_categories;

/// Table holding one row per imported dataset.
pub const DATASETS_TABLE: &str = "datasets";
/// Table holding one row per item.
pub const ITEMS_TABLE: &str = "tweets";

struct Migration {
    version: i64,
    description: &'static str,
    apply: fn(&Transaction<'_>) -> Result<(), StoreError>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create datasets and items tables",
        apply: create_base_tables,
    },
    Migration {
        version: 2,
        description: "add category flag columns",
        apply: add_category_columns,
    },
    Migration {
        version: 3,
        description: "add follow-up answer columns",
        apply: add_follow_up_columns,
    },
    Migration {
        version: 4,
        description: "add dwell time column",
        apply: add_dwell_time_column,
    },
    Migration {
        version: 5,
        description: "add dataset exported flag",
        apply: add_exported_column,
    },
    Migration {
        version: 6,
        description: "index items by dataset position",
        apply: add_position_index,
    },
];

/// Version reached after every known migration has run.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Read the schema version recorded in the database header.
pub fn schema_version(connection: &Connection) -> Result<i64, StoreError> {
    connection
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(map_sql_error)
}

/// Apply every migration newer than the recorded version, one transaction each.
pub(super) fn apply_migrations(connection: &mut Connection) -> Result<(), StoreError> {
    let current = schema_version(connection)?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = connection.transaction().map_err(map_sql_error)?;
        (migration.apply)(&tx)?;
        tx.pragma_update(None, "user_version", migration.version)
            .map_err(map_sql_error)?;
        tx.commit().map_err(map_sql_error)?;
        tracing::info!(
            "Applied store migration {}: {}",
            migration.version,
            migration.description
        );
    }
    Ok(())
}

/// Column names currently present on `table`.
pub(super) fn table_columns(
    connection: &Connection,
    table: &str,
) -> Result<HashSet<String>, StoreError> {
    let mut stmt = connection
        .prepare(&format!("PRAGMA table_info({table})"))
        .map_err(map_sql_error)?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(map_sql_error)?
        .collect::<Result<HashSet<_>, _>>()
        .map_err(map_sql_error)?;
    Ok(columns)
}

fn add_column_if_missing(
    tx: &Transaction<'_>,
    table: &str,
    existing: &HashSet<String>,
    column: &str,
    declaration: &str,
) -> Result<(), StoreError> {
    if existing.contains(column) {
        return Ok(());
    }
    tx.execute(
        &format!("ALTER TABLE {table} ADD COLUMN {column} {declaration}"),
        [],
    )
    .map_err(map_sql_error)?;
    Ok(())
}

fn create_base_tables(tx: &Transaction<'_>) -> Result<(), StoreError> {
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS datasets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT,
            source_path TEXT,
            created_at TEXT NOT NULL,
            cursor INTEGER DEFAULT 0,
            total INTEGER DEFAULT 0
         );
         CREATE TABLE IF NOT EXISTS tweets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            dataset_id INTEGER NOT NULL,
            idx INTEGER NOT NULL,
            text TEXT NOT NULL,
            annotated INTEGER DEFAULT 0,
            FOREIGN KEY(dataset_id) REFERENCES datasets(id)
         );",
    )
    .map_err(map_sql_error)
}

fn add_category_columns(tx: &Transaction<'_>) -> Result<(), StoreError> {
    let existing = table_columns(tx, ITEMS_TABLE)?;
    for column in flag_columns() {
        add_column_if_missing(tx, ITEMS_TABLE, &existing, column, "INTEGER NOT NULL DEFAULT 0")?;
    }
    Ok(())
}

fn add_follow_up_columns(tx: &Transaction<'_>) -> Result<(), StoreError> {
    let existing = table_columns(tx, ITEMS_TABLE)?;
    for category in detail_categories() {
        add_column_if_missing(
            tx,
            ITEMS_TABLE,
            &existing,
            &detail_column(category),
            "INTEGER NOT NULL DEFAULT -1",
        )?;
    }
    add_column_if_missing(tx, ITEMS_TABLE, &existing, "intent", "INTEGER NOT NULL DEFAULT -1")
}

fn add_dwell_time_column(tx: &Transaction<'_>) -> Result<(), StoreError> {
    let existing = table_columns(tx, ITEMS_TABLE)?;
    add_column_if_missing(
        tx,
        ITEMS_TABLE,
        &existing,
        "time_spent_ms",
        "INTEGER NOT NULL DEFAULT 0",
    )
}

fn add_exported_column(tx: &Transaction<'_>) -> Result<(), StoreError> {
    let existing = table_columns(tx, DATASETS_TABLE)?;
    add_column_if_missing(
        tx,
        DATASETS_TABLE,
        &existing,
        "exported",
        "INTEGER NOT NULL DEFAULT 0",
    )
}

fn add_position_index(tx: &Transaction<'_>) -> Result<(), StoreError> {
    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_tweets_dataset_idx ON tweets (dataset_id, idx);",
    )
    .map_err(map_sql_error)
}
