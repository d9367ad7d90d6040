use std::path::Path;

use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

use super::StoreError;

/// Translate rusqlite errors into friendlier StoreError variants.
pub(super) fn map_sql_error(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(sql_err, _)
            if matches!(
                sql_err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ) =>
        {
            StoreError::Busy
        }
        other => StoreError::Sql(other),
    }
}

pub(super) fn create_parent_if_needed(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Local wall-clock time formatted for the `created_at` column.
pub(super) fn timestamp_now() -> String {
    const FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(FORMAT)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// Convert a stored non-negative integer, treating negatives as zero.
pub(super) fn to_usize(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}
