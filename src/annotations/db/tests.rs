use super::schema::{latest_version, schema_version, table_columns};
use super::*;
use crate::annotations::labels::{INTENT_QUESTION, detail_categories};
use rusqlite::params;
use tempfile::tempdir;

/// Layout written by the first release: flags without NOT NULL, no exported
/// flag, no dwell time, plus a column the current code no longer reads.
const LEGACY_SCHEMA_SQL: &str = r#"
CREATE TABLE datasets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    source_path TEXT,
    created_at TEXT NOT NULL,
    cursor INTEGER DEFAULT 0,
    total INTEGER DEFAULT 0
);
CREATE TABLE tweets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dataset_id INTEGER NOT NULL,
    idx INTEGER NOT NULL,
    text TEXT NOT NULL,
    annotated INTEGER DEFAULT 0,
    imigracja INTEGER DEFAULT 0,
    klimat INTEGER DEFAULT 0,
    klimat_detail INTEGER DEFAULT -1,
    stance INTEGER DEFAULT 0,
    FOREIGN KEY(dataset_id) REFERENCES datasets(id)
);
INSERT INTO datasets (name, source_path, created_at, cursor, total)
    VALUES ('old.csv', '/tmp/old.csv', '2023-05-01 10:00:00', 1, 2);
INSERT INTO tweets (dataset_id, idx, text, annotated, klimat, klimat_detail, stance)
    VALUES (1, 0, 'legacy first', 1, 1, 2, 1);
INSERT INTO tweets (dataset_id, idx, text) VALUES (1, 1, 'legacy second');
"#;

fn open_temp() -> (tempfile::TempDir, AnnotationStore) {
    let dir = tempdir().unwrap();
    let store = AnnotationStore::open(dir.path().join("store").join("annotations.sqlite3")).unwrap();
    (dir, store)
}

fn import(store: &AnnotationStore, rows: &[&str]) -> ImportSummary {
    store
        .import_items("sample.csv", Path::new("/data/sample.csv"), rows)
        .unwrap()
}

fn item_at(store: &AnnotationStore, dataset: DatasetId, index: usize) -> Item {
    store.fetch_item(dataset, index).unwrap().unwrap()
}

#[test]
fn fresh_store_reaches_latest_version() {
    let (_dir, store) = open_temp();
    assert_eq!(schema_version(&store.connection).unwrap(), latest_version());
    let columns = table_columns(&store.connection, "tweets").unwrap();
    for category in CATEGORIES.iter() {
        assert!(columns.contains(category.key), "{}", category.key);
    }
    for category in detail_categories() {
        assert!(columns.contains(&detail_column(category)));
    }
    assert!(columns.contains("intent"));
    assert!(columns.contains("time_spent_ms"));
    assert!(table_columns(&store.connection, "datasets").unwrap().contains("exported"));
}

#[test]
fn reopening_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("annotations.sqlite3");
    let summary = {
        let store = AnnotationStore::open(&path).unwrap();
        import(&store, &["kept"])
    };
    let store = AnnotationStore::open(&path).unwrap();
    assert_eq!(item_at(&store, summary.dataset_id, 0).text, "kept");
    assert_eq!(schema_version(&store.connection).unwrap(), latest_version());
}

#[test]
fn legacy_store_gains_missing_columns_with_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("annotations.sqlite3");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(LEGACY_SCHEMA_SQL).unwrap();
    }

    let store = AnnotationStore::open(&path).unwrap();
    let columns = table_columns(&store.connection, "tweets").unwrap();
    assert!(columns.contains("stance"), "existing columns are never dropped");
    assert!(columns.contains("zdrowie_detail"));

    let dataset = store.dataset(DatasetId::new(1)).unwrap().unwrap();
    assert_eq!(dataset.cursor, 1);
    assert!(!dataset.exported);

    let first = item_at(&store, dataset.id, 0);
    assert!(first.annotated);
    assert!(first.labels.get("klimat"));
    assert_eq!(first.detail("klimat"), Choice::option(2));
    assert_eq!(first.detail("zdrowie"), Choice::UNANSWERED);
    assert_eq!(first.intent, Choice::UNANSWERED);
    assert_eq!(first.dwell_ms, 0);

    let second = item_at(&store, dataset.id, 1);
    assert_eq!(second.labels, LabelFlags::default());
}

#[test]
fn corrupt_file_fails_with_init_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("annotations.sqlite3");
    std::fs::write(&path, vec![b'x'; 4096]).unwrap();
    let err = AnnotationStore::open(&path).err().unwrap();
    assert!(matches!(err, StoreError::Init { .. }), "{err}");
}

#[test]
fn unwritable_location_fails_with_init_error() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, b"file").unwrap();
    let err = AnnotationStore::open(blocker.join("annotations.sqlite3"))
        .err()
        .unwrap();
    assert!(matches!(err, StoreError::Init { .. }), "{err}");
}

#[test]
fn import_round_trips_texts_in_order_with_defaults() {
    let (_dir, store) = open_temp();
    let rows = ["  hello world ", "", "second, with comma", "   ", "zażółć \"gęślą\""];
    let summary = import(&store, &rows);
    assert_eq!(summary.total, 3);

    let dataset = store.dataset(summary.dataset_id).unwrap().unwrap();
    assert_eq!(dataset.name, "sample.csv");
    assert_eq!(dataset.source_path, PathBuf::from("/data/sample.csv"));
    assert_eq!((dataset.cursor, dataset.total, dataset.exported), (0, 3, false));

    let expected = ["hello world", "second, with comma", "zażółć \"gęślą\""];
    for (index, text) in expected.iter().enumerate() {
        let item = item_at(&store, summary.dataset_id, index);
        assert_eq!(item.index, index);
        assert_eq!(&item.text, text);
        assert!(!item.annotated);
        assert_eq!(item.labels, LabelFlags::default());
        assert!(item.details.iter().all(|choice| !choice.is_answered()));
        assert_eq!(item.intent, Choice::UNANSWERED);
    }
    assert!(store.fetch_item(summary.dataset_id, 3).unwrap().is_none());
}

#[test]
fn blank_only_import_is_rejected_without_creating_a_dataset() {
    let (_dir, store) = open_temp();
    let err = store
        .import_items("empty.csv", Path::new("empty.csv"), &["", "  "])
        .unwrap_err();
    assert!(matches!(err, StoreError::EmptyImport));
    let count: i64 = store
        .connection
        .query_row("SELECT COUNT(*) FROM datasets", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn fetch_item_for_unknown_dataset_is_none() {
    let (_dir, store) = open_temp();
    assert!(store.fetch_item(DatasetId::new(42), 0).unwrap().is_none());
    assert!(store.dataset(DatasetId::new(42)).unwrap().is_none());
}

#[test]
fn items_require_an_existing_dataset() {
    let (_dir, store) = open_temp();
    let err = store
        .connection
        .execute(
            "INSERT INTO tweets (dataset_id, idx, text) VALUES (?1, 0, 'orphan')",
            params![99],
        )
        .unwrap_err();
    assert!(err.to_string().contains("FOREIGN KEY"), "{err}");
}

#[test]
fn update_labels_leaves_follow_ups_alone() {
    let (_dir, store) = open_temp();
    let summary = import(&store, &["one"]);
    let item = item_at(&store, summary.dataset_id, 0);
    store.update_detail(item.id, "klimat", 3).unwrap();

    store
        .update_labels(item.id, &LabelFlags::from_active(["zdrowie"]), false)
        .unwrap();
    let reloaded = item_at(&store, summary.dataset_id, 0);
    assert!(reloaded.labels.get("zdrowie"));
    assert!(!reloaded.labels.get("klimat"));
    assert_eq!(reloaded.detail("klimat"), Choice::option(3));
}

#[test]
fn update_labels_marks_annotated_only_when_asked() {
    let (_dir, store) = open_temp();
    let summary = import(&store, &["one", "two"]);
    let first = item_at(&store, summary.dataset_id, 0);
    let second = item_at(&store, summary.dataset_id, 1);

    store
        .update_labels(first.id, &LabelFlags::from_active(["inne"]), false)
        .unwrap();
    store
        .update_labels(second.id, &LabelFlags::default(), true)
        .unwrap();

    assert!(!item_at(&store, summary.dataset_id, 0).annotated);
    assert!(item_at(&store, summary.dataset_id, 1).annotated);
}

#[test]
fn answering_a_follow_up_marks_annotated() {
    let (_dir, store) = open_temp();
    let summary = import(&store, &["one", "two"]);
    let first = item_at(&store, summary.dataset_id, 0);
    let second = item_at(&store, summary.dataset_id, 1);

    store.update_detail(first.id, "zaufanie", 0).unwrap();
    store.update_intent(second.id, 5).unwrap();

    let first = item_at(&store, summary.dataset_id, 0);
    let second = item_at(&store, summary.dataset_id, 1);
    assert!(first.annotated && second.annotated);
    assert_eq!(first.detail("zaufanie"), Choice::option(0));
    assert_eq!(second.intent, Choice::option(5));

    store.clear_detail(first.id, "zaufanie").unwrap();
    store.clear_intent(second.id).unwrap();
    assert_eq!(
        item_at(&store, summary.dataset_id, 0).detail("zaufanie"),
        Choice::UNANSWERED
    );
    assert_eq!(item_at(&store, summary.dataset_id, 1).intent, Choice::UNANSWERED);
    assert!(item_at(&store, summary.dataset_id, 1).annotated);
}

#[test]
fn follow_up_updates_validate_category_and_option() {
    let (_dir, store) = open_temp();
    let summary = import(&store, &["one"]);
    let item = item_at(&store, summary.dataset_id, 0);

    assert!(matches!(
        store.update_detail(item.id, "pogoda", 0),
        Err(StoreError::UnknownCategory(_))
    ));
    assert!(matches!(
        store.update_detail(item.id, "inne", 0),
        Err(StoreError::NoFollowUp("inne"))
    ));
    assert!(matches!(
        store.update_detail(item.id, "klimat", 5),
        Err(StoreError::InvalidChoice { option: 5, .. })
    ));
    assert!(matches!(
        store.update_intent(item.id, INTENT_QUESTION.options.len()),
        Err(StoreError::InvalidChoice { .. })
    ));
    assert!(!item_at(&store, summary.dataset_id, 0).annotated);
}

#[test]
fn writes_to_unknown_rows_report_not_found() {
    let (_dir, store) = open_temp();
    let missing = ItemId::new(404);
    assert!(matches!(
        store.update_labels(missing, &LabelFlags::default(), true),
        Err(StoreError::UnknownItem(id)) if id == missing
    ));
    assert!(matches!(
        store.add_dwell_time(missing, 10),
        Err(StoreError::UnknownItem(_))
    ));
    assert!(matches!(
        store.set_cursor(DatasetId::new(7), 1),
        Err(StoreError::UnknownDataset(_))
    ));
}

#[test]
fn apply_labels_clears_answers_of_deactivated_categories() {
    let (_dir, store) = open_temp();
    let summary = import(&store, &["one"]);
    let item = item_at(&store, summary.dataset_id, 0);

    store
        .apply_labels(item.id, &LabelFlags::from_active(["klimat", "zdrowie", "inne"]))
        .unwrap();
    store.update_detail(item.id, "klimat", 1).unwrap();
    store.update_detail(item.id, "zdrowie", 4).unwrap();
    store.update_intent(item.id, 2).unwrap();

    let change = store
        .apply_labels(item.id, &LabelFlags::from_active(["zdrowie"]))
        .unwrap();
    let cleared: Vec<_> = change.cleared.iter().map(|c| c.key).collect();
    assert_eq!(cleared, vec!["klimat", "inne"]);
    assert!(change.previous.get("klimat"));

    let reloaded = item_at(&store, summary.dataset_id, 0);
    assert_eq!(reloaded.detail("klimat"), Choice::UNANSWERED);
    assert_eq!(reloaded.intent, Choice::UNANSWERED);
    assert_eq!(reloaded.detail("zdrowie"), Choice::option(4));
    assert!(reloaded.annotated);
}

#[test]
fn apply_labels_on_missing_item_changes_nothing() {
    let (_dir, store) = open_temp();
    let err = store
        .apply_labels(ItemId::new(5), &LabelFlags::from_active(["klimat"]))
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownItem(_)));
}

#[test]
fn dwell_time_accumulates() {
    let (_dir, store) = open_temp();
    let summary = import(&store, &["one"]);
    let item = item_at(&store, summary.dataset_id, 0);
    store.add_dwell_time(item.id, 1_250).unwrap();
    store.add_dwell_time(item.id, 0).unwrap();
    store.add_dwell_time(item.id, 750).unwrap();
    assert_eq!(item_at(&store, summary.dataset_id, 0).dwell_ms, 2_000);
}

#[test]
fn cursor_and_progress() {
    let (_dir, store) = open_temp();
    let summary = import(&store, &["a", "b", "c"]);
    store.set_cursor(summary.dataset_id, 2).unwrap();
    assert_eq!(store.dataset(summary.dataset_id).unwrap().unwrap().cursor, 2);

    for index in 0..2 {
        let item = item_at(&store, summary.dataset_id, index);
        store
            .update_labels(item.id, &LabelFlags::default(), true)
            .unwrap();
    }
    let progress = store.count_progress(summary.dataset_id).unwrap();
    assert_eq!(progress, Progress { done: 2, total: 3 });
    assert_eq!(progress.missing(), 1);
    assert!(!progress.is_complete());
    assert!(matches!(
        store.count_progress(DatasetId::new(99)),
        Err(StoreError::UnknownDataset(_))
    ));
}

#[test]
fn mark_exported_sets_flag() {
    let (_dir, store) = open_temp();
    let summary = import(&store, &["a"]);
    store.mark_exported(summary.dataset_id).unwrap();
    assert!(store.dataset(summary.dataset_id).unwrap().unwrap().exported);
}

#[test]
fn datasets_are_independent() {
    let (_dir, store) = open_temp();
    let first = import(&store, &["a", "b"]);
    let second = import(&store, &["c"]);
    assert_ne!(first.dataset_id, second.dataset_id);
    assert_eq!(store.items(first.dataset_id).unwrap().len(), 2);
    assert_eq!(item_at(&store, second.dataset_id, 0).text, "c");
}
