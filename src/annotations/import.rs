//! Reading the `tweets` column out of a CSV file.

use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Header of the column holding the texts to annotate.
pub const TWEETS_COLUMN: &str = "tweets";

/// Errors returned while reading an import file.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The file could not be opened or parsed as CSV.
    #[error("Failed to read CSV {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    /// The header row has no `tweets` column.
    #[error("The CSV file must contain a 'tweets' column")]
    MissingTweetsColumn,
    /// Every row of the `tweets` column was blank.
    #[error("No tweets to import")]
    Empty,
}

impl ImportError {
    /// True for problems the user fixes by editing the file.
    pub fn is_content_error(&self) -> bool {
        matches!(self, Self::MissingTweetsColumn | Self::Empty)
    }
}

/// Display name and absolute path recorded on the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSource {
    pub name: String,
    pub path: PathBuf,
}

impl ImportSource {
    /// Derive the dataset name from the file name and resolve the absolute path.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        Self { name, path }
    }
}

/// Read every non-blank, trimmed cell of the `tweets` column in file order.
pub fn read_tweets(path: &Path) -> Result<Vec<String>, ImportError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|source| ImportError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    collect_tweets(reader, path)
}

/// Same as [`read_tweets`] for an in-memory or already-open source.
pub fn read_tweets_from<R: Read>(source: R) -> Result<Vec<String>, ImportError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);
    collect_tweets(reader, Path::new("<memory>"))
}

fn collect_tweets<R: Read>(
    mut reader: csv::Reader<R>,
    path: &Path,
) -> Result<Vec<String>, ImportError> {
    let csv_error = |source: csv::Error| ImportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let column = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .position(|header| header == TWEETS_COLUMN)
        .ok_or(ImportError::MissingTweetsColumn)?;

    let mut tweets = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let text = record.get(column).unwrap_or("").trim();
        if !text.is_empty() {
            tweets.push(text.to_string());
        }
    }
    if tweets.is_empty() {
        return Err(ImportError::Empty);
    }
    Ok(tweets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_tweets_column_skipping_blanks() {
        let csv = "id,tweets,lang\n1,  first  ,pl\n2,,pl\n3,\"multi\nline, quoted\",en\n4,   ,pl\n";
        let tweets = read_tweets_from(csv.as_bytes()).unwrap();
        assert_eq!(tweets, vec!["first", "multi\nline, quoted"]);
    }

    #[test]
    fn short_rows_are_treated_as_blank() {
        let csv = "id,tweets\n1\n2,kept\n";
        assert_eq!(read_tweets_from(csv.as_bytes()).unwrap(), vec!["kept"]);
    }

    #[test]
    fn missing_column_is_a_content_error() {
        let err = read_tweets_from("id,text\n1,hello\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::MissingTweetsColumn));
        assert!(err.is_content_error());
    }

    #[test]
    fn header_only_file_is_empty() {
        let err = read_tweets_from("tweets\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::Empty));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempdir().unwrap();
        let err = read_tweets(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, ImportError::Csv { .. }));
        assert!(!err.is_content_error());
    }

    #[test]
    fn source_uses_file_name_and_absolute_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch_01.csv");
        let source = ImportSource::from_path(&path);
        assert_eq!(source.name, "batch_01.csv");
        assert!(source.path.is_absolute());
    }
}
