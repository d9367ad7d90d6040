use std::path::Path;
use std::sync::LazyLock;

use rusqlite::{OptionalExtension, params};

use super::util::{map_sql_error, timestamp_now};
use super::{
    AnnotationStore, DatasetId, ImportSummary, ItemId, ItemWriteBatch, StoreError, detail_column,
};
use crate::annotations::labels::{
    self, CATEGORIES, CATEGORY_COUNT, Category, Choice, FollowUpKind, INTENT_QUESTION, LabelFlags,
};

static SET_LABELS_SQL: LazyLock<String> = LazyLock::new(|| {
    let sets: Vec<String> = CATEGORIES
        .iter()
        .enumerate()
        .map(|(idx, category)| format!("{} = ?{}", category.key, idx + 1))
        .collect();
    format!(
        "UPDATE tweets SET {}, annotated = MAX(COALESCE(annotated, 0), ?{}) WHERE id = ?{}",
        sets.join(", "),
        CATEGORY_COUNT + 1,
        CATEGORY_COUNT + 2
    )
});

static SELECT_LABELS_SQL: LazyLock<String> = LazyLock::new(|| {
    let columns: Vec<String> = CATEGORIES
        .iter()
        .map(|category| format!("COALESCE({}, 0)", category.key))
        .collect();
    format!("SELECT {} FROM tweets WHERE id = ?1", columns.join(", "))
});

/// Flags before and after a label save, plus the follow-ups that were wiped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelChange {
    pub previous: LabelFlags,
    pub current: LabelFlags,
    /// Categories whose stored answer was reset because they were switched off.
    pub cleared: Vec<&'static Category>,
}

impl AnnotationStore {
    /// Create a dataset from trimmed, non-blank texts in one transaction.
    ///
    /// Blank rows are dropped; positions follow the order of the remaining rows.
    pub fn import_items<S: AsRef<str>>(
        &self,
        name: &str,
        source_path: &Path,
        rows: &[S],
    ) -> Result<ImportSummary, StoreError> {
        let texts: Vec<&str> = rows
            .iter()
            .map(|row| row.as_ref().trim())
            .filter(|text| !text.is_empty())
            .collect();
        if texts.is_empty() {
            return Err(StoreError::EmptyImport);
        }

        let tx = self
            .connection
            .unchecked_transaction()
            .map_err(map_sql_error)?;
        tx.execute(
            "INSERT INTO datasets (name, source_path, created_at, cursor, total, exported)
             VALUES (?1, ?2, ?3, 0, ?4, 0)",
            params![
                name,
                source_path.to_string_lossy().into_owned(),
                timestamp_now(),
                texts.len() as i64
            ],
        )
        .map_err(map_sql_error)?;
        let dataset_id = DatasetId::new(tx.last_insert_rowid());
        {
            let mut stmt = tx
                .prepare_cached("INSERT INTO tweets (dataset_id, idx, text) VALUES (?1, ?2, ?3)")
                .map_err(map_sql_error)?;
            for (idx, text) in texts.iter().enumerate() {
                stmt.execute(params![dataset_id.get(), idx as i64, text])
                    .map_err(map_sql_error)?;
            }
        }
        tx.commit().map_err(map_sql_error)?;

        tracing::info!(
            "Imported dataset {dataset_id} ({name}) with {} items",
            texts.len()
        );
        Ok(ImportSummary {
            dataset_id,
            total: texts.len(),
        })
    }

    /// Overwrite every category flag of an item; detail and intent columns are untouched.
    pub fn update_labels(
        &self,
        item: ItemId,
        flags: &LabelFlags,
        mark_annotated: bool,
    ) -> Result<(), StoreError> {
        let mut batch = self.write_batch()?;
        batch.set_labels(item, flags, mark_annotated)?;
        batch.commit()
    }

    /// Save new flags and reset the follow-up of every category switched off.
    ///
    /// Reading the previous flags, writing the new ones and clearing stale
    /// answers happen in one transaction. The item is marked annotated.
    pub fn apply_labels(&self, item: ItemId, next: &LabelFlags) -> Result<LabelChange, StoreError> {
        let mut batch = self.write_batch()?;
        let previous = batch.labels(item)?;
        batch.set_labels(item, next, true)?;
        let mut cleared = Vec::new();
        for category in previous.deactivated_in(next) {
            match category.follow_up {
                FollowUpKind::Detail(_) => batch.set_detail(item, category, Choice::UNANSWERED)?,
                FollowUpKind::Intent => batch.set_intent(item, Choice::UNANSWERED)?,
                FollowUpKind::None => continue,
            }
            cleared.push(category);
        }
        batch.commit()?;
        Ok(LabelChange {
            previous,
            current: *next,
            cleared,
        })
    }

    /// Record a detail answer and mark the item annotated.
    pub fn update_detail(
        &self,
        item: ItemId,
        category_key: &str,
        option: usize,
    ) -> Result<(), StoreError> {
        let category = detail_category(category_key)?;
        let question = category
            .detail_question()
            .ok_or(StoreError::NoFollowUp(category.key))?;
        check_option(question.prompt, question.options.len(), option)?;
        let mut batch = self.write_batch()?;
        batch.set_detail(item, category, Choice::option(option))?;
        batch.mark_annotated(item)?;
        batch.commit()
    }

    /// Reset a detail answer to unanswered.
    pub fn clear_detail(&self, item: ItemId, category_key: &str) -> Result<(), StoreError> {
        let category = detail_category(category_key)?;
        let mut batch = self.write_batch()?;
        batch.set_detail(item, category, Choice::UNANSWERED)?;
        batch.commit()
    }

    /// Record the intent answer and mark the item annotated.
    pub fn update_intent(&self, item: ItemId, option: usize) -> Result<(), StoreError> {
        check_option(
            INTENT_QUESTION.prompt,
            INTENT_QUESTION.options.len(),
            option,
        )?;
        let mut batch = self.write_batch()?;
        batch.set_intent(item, Choice::option(option))?;
        batch.mark_annotated(item)?;
        batch.commit()
    }

    /// Reset the intent answer to unanswered.
    pub fn clear_intent(&self, item: ItemId) -> Result<(), StoreError> {
        let mut batch = self.write_batch()?;
        batch.set_intent(item, Choice::UNANSWERED)?;
        batch.commit()
    }

    /// Add elapsed on-screen time to an item. Zero is a no-op.
    pub fn add_dwell_time(&self, item: ItemId, elapsed_ms: u64) -> Result<(), StoreError> {
        if elapsed_ms == 0 {
            return Ok(());
        }
        let elapsed = i64::try_from(elapsed_ms).unwrap_or(i64::MAX);
        let updated = self
            .connection
            .execute(
                "UPDATE tweets SET time_spent_ms = COALESCE(time_spent_ms, 0) + ?1 WHERE id = ?2",
                params![elapsed, item.get()],
            )
            .map_err(map_sql_error)?;
        expect_row(updated, StoreError::UnknownItem(item))
    }

    /// Persist the cursor of a dataset.
    pub fn set_cursor(&self, dataset: DatasetId, cursor: usize) -> Result<(), StoreError> {
        let updated = self
            .connection
            .execute(
                "UPDATE datasets SET cursor = ?1 WHERE id = ?2",
                params![cursor as i64, dataset.get()],
            )
            .map_err(map_sql_error)?;
        expect_row(updated, StoreError::UnknownDataset(dataset))
    }

    /// Retire a dataset after a successful export.
    pub fn mark_exported(&self, dataset: DatasetId) -> Result<(), StoreError> {
        let mut batch = self.write_batch()?;
        batch.mark_exported(dataset)?;
        batch.commit()
    }

    /// Start a write batch that wraps related item mutations in one transaction.
    pub fn write_batch(&self) -> Result<ItemWriteBatch<'_>, StoreError> {
        let tx = self
            .connection
            .unchecked_transaction()
            .map_err(map_sql_error)?;
        Ok(ItemWriteBatch { tx })
    }
}

impl ItemWriteBatch<'_> {
    /// Current flags of an item as seen inside this transaction.
    pub fn labels(&mut self, item: ItemId) -> Result<LabelFlags, StoreError> {
        let values = self
            .tx
            .prepare_cached(SELECT_LABELS_SQL.as_str())
            .map_err(map_sql_error)?
            .query_row(params![item.get()], |row| {
                let mut values = [false; CATEGORY_COUNT];
                for (idx, value) in values.iter_mut().enumerate() {
                    *value = row.get::<_, i64>(idx)? != 0;
                }
                Ok(values)
            })
            .optional()
            .map_err(map_sql_error)?
            .ok_or(StoreError::UnknownItem(item))?;
        Ok(LabelFlags::from_array(values))
    }

    /// Overwrite all flags; optionally mark the item annotated.
    pub fn set_labels(
        &mut self,
        item: ItemId,
        flags: &LabelFlags,
        mark_annotated: bool,
    ) -> Result<(), StoreError> {
        let mut values: Vec<i64> = flags.values().iter().map(|&flag| i64::from(flag)).collect();
        values.push(i64::from(mark_annotated));
        values.push(item.get());
        let updated = self
            .tx
            .prepare_cached(SET_LABELS_SQL.as_str())
            .map_err(map_sql_error)?
            .execute(rusqlite::params_from_iter(values))
            .map_err(map_sql_error)?;
        expect_row(updated, StoreError::UnknownItem(item))
    }

    /// Store a detail answer for a detail-bearing category.
    pub fn set_detail(
        &mut self,
        item: ItemId,
        category: &Category,
        choice: Choice,
    ) -> Result<(), StoreError> {
        if !category.has_detail() {
            return Err(StoreError::NoFollowUp(category.key));
        }
        let updated = self
            .tx
            .execute(
                &format!("UPDATE tweets SET {} = ?1 WHERE id = ?2", detail_column(category)),
                params![choice.as_i64(), item.get()],
            )
            .map_err(map_sql_error)?;
        expect_row(updated, StoreError::UnknownItem(item))
    }

    /// Store the intent answer.
    pub fn set_intent(&mut self, item: ItemId, choice: Choice) -> Result<(), StoreError> {
        let updated = self
            .tx
            .prepare_cached("UPDATE tweets SET intent = ?1 WHERE id = ?2")
            .map_err(map_sql_error)?
            .execute(params![choice.as_i64(), item.get()])
            .map_err(map_sql_error)?;
        expect_row(updated, StoreError::UnknownItem(item))
    }

    /// Mark an item annotated.
    pub fn mark_annotated(&mut self, item: ItemId) -> Result<(), StoreError> {
        let updated = self
            .tx
            .prepare_cached("UPDATE tweets SET annotated = 1 WHERE id = ?1")
            .map_err(map_sql_error)?
            .execute(params![item.get()])
            .map_err(map_sql_error)?;
        expect_row(updated, StoreError::UnknownItem(item))
    }

    /// Set the exported flag of a dataset.
    pub fn mark_exported(&mut self, dataset: DatasetId) -> Result<(), StoreError> {
        let updated = self
            .tx
            .prepare_cached("UPDATE datasets SET exported = 1 WHERE id = ?1")
            .map_err(map_sql_error)?
            .execute(params![dataset.get()])
            .map_err(map_sql_error)?;
        expect_row(updated, StoreError::UnknownDataset(dataset))
    }

    /// Commit the batch.
    pub fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().map_err(map_sql_error)
    }
}

fn detail_category(key: &str) -> Result<&'static Category, StoreError> {
    let category =
        labels::category(key).ok_or_else(|| StoreError::UnknownCategory(key.to_string()))?;
    if !category.has_detail() {
        return Err(StoreError::NoFollowUp(category.key));
    }
    Ok(category)
}

fn check_option(question: &'static str, options: usize, option: usize) -> Result<(), StoreError> {
    if option < options {
        Ok(())
    } else {
        Err(StoreError::InvalidChoice { question, option })
    }
}

fn expect_row(updated: usize, missing: StoreError) -> Result<(), StoreError> {
    if updated == 0 { Err(missing) } else { Ok(()) }
}
