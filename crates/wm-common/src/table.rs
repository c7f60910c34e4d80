use clap::ValueEnum;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// What to do with the header of an output table that already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum HeaderPolicy {
    /// Append data lines without looking at the existing header.
    /// Rows of a different width end up in the same file unnoticed.
    #[default]
    Trust,
    /// Refuse to append when the existing first line differs from the header.
    Verify,
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to open output table {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write output table {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to read header of {path}: {source}")]
    ReadHeader {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("row has {row} cells but header has {header} columns")]
    RowWidth { header: usize, row: usize },
    #[error("existing header of {path} is {found:?}, expected {expected:?}")]
    HeaderMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Appends one row to the CSV table at `path`.
///
/// A missing file is created with `header` as its first line. An existing
/// file only receives the row; under [`HeaderPolicy::Verify`] its first line
/// must equal `header`. The file is closed again before returning.
pub fn append_row(
    path: &Path,
    header: &[String],
    row: &[String],
    policy: HeaderPolicy,
) -> Result<(), TableError> {
    if row.len() != header.len() {
        return Err(TableError::RowWidth {
            header: header.len(),
            row: row.len(),
        });
    }

    let (file, fresh) = open_for_append(path)?;

    if !fresh && policy == HeaderPolicy::Verify {
        verify_header(path, header)?;
    }

    let write_err = |source| TableError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(file);

    if fresh {
        debug!(path = %path.display(), columns = header.len(), "creating output table");
        writer.write_record(header).map_err(write_err)?;
    }
    writer.write_record(row).map_err(write_err)?;
    writer.flush().map_err(|err| write_err(err.into()))?;

    Ok(())
}

fn open_for_append(path: &Path) -> Result<(File, bool), TableError> {
    let open_err = |source| TableError::Open {
        path: path.to_path_buf(),
        source,
    };

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok((file, true)),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            let file = OpenOptions::new().append(true).open(path).map_err(open_err)?;
            Ok((file, false))
        }
        Err(err) => Err(open_err(err)),
    }
}

fn verify_header(path: &Path, header: &[String]) -> Result<(), TableError> {
    let file = File::open(path).map_err(|source| TableError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let found: Vec<String> = match reader.records().next() {
        Some(record) => record
            .map_err(|source| TableError::ReadHeader {
                path: path.to_path_buf(),
                source,
            })?
            .iter()
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    };

    if found != header {
        return Err(TableError::HeaderMismatch {
            path: path.to_path_buf(),
            expected: header.to_vec(),
            found,
        });
    }
    Ok(())
}

/// An output table with a fixed header, appended to one row at a time.
#[derive(Debug, Clone)]
pub struct TableSink {
    path: PathBuf,
    header: Vec<String>,
    policy: HeaderPolicy,
    rows_written: usize,
}

impl TableSink {
    pub fn new(path: impl Into<PathBuf>, header: Vec<String>, policy: HeaderPolicy) -> Self {
        Self {
            path: path.into(),
            header,
            policy,
            rows_written: 0,
        }
    }

    pub fn append(&mut self, row: &[String]) -> Result<(), TableError> {
        append_row(&self.path, &self.header, row, self.policy)?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn finish(self) -> usize {
        if self.rows_written > 0 {
            info!(
                path = %self.path.display(),
                rows = self.rows_written,
                "output table written"
            );
        }
        self.rows_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn fresh_table_gets_exactly_one_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let header = strings(&["word", "dimension_0"]);

        append_row(&path, &header, &strings(&["a", "1"]), HeaderPolicy::Trust).unwrap();
        append_row(&path, &header, &strings(&["b", "2"]), HeaderPolicy::Trust).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "word,dimension_0\na,1\nb,2\n");
    }

    #[test]
    fn embedding_row_round_trips_as_plain_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("emb.csv");
        let header = crate::movement::embedding_header(3);
        let row = crate::movement::embedding_row("apple", &[0.1, 0.2, 0.3]);

        append_row(&path, &header, &row, HeaderPolicy::Trust).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines, vec!["word,dimension_0,dimension_1,dimension_2", "apple,0.1,0.2,0.3"]);
    }

    #[test]
    fn trust_policy_appends_under_a_mismatched_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "word,dimension_0\na,1\n").unwrap();

        let header = strings(&["word", "dimension_0", "dimension_1"]);
        append_row(&path, &header, &strings(&["b", "2", "3"]), HeaderPolicy::Trust).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "word,dimension_0\na,1\nb,2,3\n");
    }

    #[test]
    fn verify_policy_rejects_a_mismatched_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "word,dimension_0\na,1\n").unwrap();

        let header = strings(&["word", "dimension_0", "dimension_1"]);
        let err = append_row(&path, &header, &strings(&["b", "2", "3"]), HeaderPolicy::Verify)
            .unwrap_err();

        match err {
            TableError::HeaderMismatch { found, expected, .. } => {
                assert_eq!(found, strings(&["word", "dimension_0"]));
                assert_eq!(expected, header);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "word,dimension_0\na,1\n");
    }

    #[test]
    fn verify_policy_appends_under_a_matching_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let header = strings(&["word", "dimension_0"]);

        append_row(&path, &header, &strings(&["a", "1"]), HeaderPolicy::Verify).unwrap();
        append_row(&path, &header, &strings(&["b", "2"]), HeaderPolicy::Verify).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "word,dimension_0\na,1\nb,2\n");
    }

    #[test]
    fn row_width_must_match_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let err = append_row(&path, &strings(&["a", "b"]), &strings(&["1"]), HeaderPolicy::Trust)
            .unwrap_err();

        assert!(matches!(err, TableError::RowWidth { header: 2, row: 1 }));
        assert!(!path.exists());
    }

    #[test]
    fn cells_with_commas_are_quoted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        append_row(&path, &strings(&["word"]), &strings(&["a,b"]), HeaderPolicy::Trust).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "word\n\"a,b\"\n");
    }

    #[test]
    fn sink_counts_rows() {
        let dir = tempdir().unwrap();
        let mut sink = TableSink::new(
            dir.path().join("out.csv"),
            strings(&["word"]),
            HeaderPolicy::Trust,
        );

        sink.append(&strings(&["a"])).unwrap();
        sink.append(&strings(&["b"])).unwrap();

        assert_eq!(sink.rows_written(), 2);
        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "word\na\nb\n");
        assert_eq!(sink.finish(), 2);
    }
}
