use std::path::PathBuf;
use std::sync::LazyLock;

use rusqlite::{OptionalExtension, Row, params};

use super::util::{map_sql_error, to_usize};
use super::{
    AnnotationStore, Dataset, DatasetId, Item, ItemId, Progress, StoreError, detail_column,
};
use crate::annotations::labels::{CATEGORIES, CATEGORY_COUNT, Choice, LabelFlags};

static ITEM_SELECT: LazyLock<String> = LazyLock::new(|| {
    let mut columns = vec![
        "id".to_string(),
        "dataset_id".to_string(),
        "idx".to_string(),
        "text".to_string(),
        "COALESCE(annotated, 0)".to_string(),
    ];
    columns.extend(
        CATEGORIES
            .iter()
            .map(|category| format!("COALESCE({}, 0)", category.key)),
    );
    columns.extend(
        CATEGORIES
            .iter()
            .filter(|category| category.has_detail())
            .map(|category| format!("COALESCE({}, -1)", detail_column(category))),
    );
    columns.push("COALESCE(intent, -1)".to_string());
    columns.push("COALESCE(time_spent_ms, 0)".to_string());
    format!("SELECT {} FROM tweets", columns.join(", "))
});

const DATASET_SELECT: &str = "SELECT id, COALESCE(name, ''), COALESCE(source_path, ''), created_at,
        COALESCE(cursor, 0), COALESCE(total, 0), COALESCE(exported, 0)
     FROM datasets";

impl AnnotationStore {
    /// Fetch a dataset by id.
    pub fn dataset(&self, id: DatasetId) -> Result<Option<Dataset>, StoreError> {
        self.connection
            .query_row(
                &format!("{DATASET_SELECT} WHERE id = ?1"),
                params![id.get()],
                dataset_from_row,
            )
            .optional()
            .map_err(map_sql_error)
    }

    /// Fetch the item at `index` within a dataset.
    ///
    /// Returns `None` for an unknown dataset or an out-of-range index.
    pub fn fetch_item(&self, dataset: DatasetId, index: usize) -> Result<Option<Item>, StoreError> {
        let Ok(index) = i64::try_from(index) else {
            return Ok(None);
        };
        let mut stmt = self
            .connection
            .prepare_cached(&format!(
                "{} WHERE dataset_id = ?1 AND idx = ?2",
                ITEM_SELECT.as_str()
            ))
            .map_err(map_sql_error)?;
        stmt.query_row(params![dataset.get(), index], item_from_row)
            .optional()
            .map_err(map_sql_error)
    }

    /// Fetch an item by its row id.
    pub fn item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let mut stmt = self
            .connection
            .prepare_cached(&format!("{} WHERE id = ?1", ITEM_SELECT.as_str()))
            .map_err(map_sql_error)?;
        stmt.query_row(params![id.get()], item_from_row)
            .optional()
            .map_err(map_sql_error)
    }

    /// All items of a dataset ordered by position.
    pub fn items(&self, dataset: DatasetId) -> Result<Vec<Item>, StoreError> {
        let mut stmt = self
            .connection
            .prepare(&format!(
                "{} WHERE dataset_id = ?1 ORDER BY idx ASC",
                ITEM_SELECT.as_str()
            ))
            .map_err(map_sql_error)?;
        let items = stmt
            .query_map(params![dataset.get()], item_from_row)
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        Ok(items)
    }

    /// Count annotated items against the dataset total.
    pub fn count_progress(&self, dataset: DatasetId) -> Result<Progress, StoreError> {
        let total: i64 = self
            .connection
            .query_row(
                "SELECT COALESCE(total, 0) FROM datasets WHERE id = ?1",
                params![dataset.get()],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_sql_error)?
            .ok_or(StoreError::UnknownDataset(dataset))?;
        let done: i64 = self
            .connection
            .query_row(
                "SELECT COUNT(*) FROM tweets WHERE dataset_id = ?1 AND annotated = 1",
                params![dataset.get()],
                |row| row.get(0),
            )
            .map_err(map_sql_error)?;
        Ok(Progress {
            done: to_usize(done),
            total: to_usize(total),
        })
    }
}

fn dataset_from_row(row: &Row<'_>) -> rusqlite::Result<Dataset> {
    let source_path: String = row.get(2)?;
    Ok(Dataset {
        id: DatasetId::new(row.get(0)?),
        name: row.get(1)?,
        source_path: PathBuf::from(source_path),
        created_at: row.get(3)?,
        cursor: to_usize(row.get(4)?),
        total: to_usize(row.get(5)?),
        exported: row.get::<_, i64>(6)? != 0,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    const FLAGS_START: usize = 5;
    let mut flags = [false; CATEGORY_COUNT];
    for (offset, flag) in flags.iter_mut().enumerate() {
        *flag = row.get::<_, i64>(FLAGS_START + offset)? != 0;
    }

    let mut column = FLAGS_START + CATEGORY_COUNT;
    let mut details = [Choice::UNANSWERED; CATEGORY_COUNT];
    for (detail, category) in details.iter_mut().zip(CATEGORIES.iter()) {
        if category.has_detail() {
            *detail = Choice::from_i64(row.get(column)?);
            column += 1;
        }
    }
    let intent = Choice::from_i64(row.get(column)?);
    let dwell_ms: i64 = row.get(column + 1)?;

    Ok(Item {
        id: ItemId::new(row.get(0)?),
        dataset_id: DatasetId::new(row.get(1)?),
        index: to_usize(row.get(2)?),
        text: row.get(3)?,
        annotated: row.get::<_, i64>(4)? != 0,
        labels: LabelFlags::from_array(flags),
        details,
        intent,
        dwell_ms: u64::try_from(dwell_ms).unwrap_or(0),
    })
}
