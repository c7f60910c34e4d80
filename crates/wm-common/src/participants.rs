use clap::ValueEnum;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Which cells of a participant file hold the response words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum WordLayout {
    /// Every field of the first record (`cat,dog,cat`).
    #[default]
    FirstRow,
    /// The first field of every record (one word per line).
    FirstColumn,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read participant directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open participant file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed participant file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("participant file {0} contains no words")]
    EmptyFile(PathBuf),
}

/// One participant's responses, in the order they were produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRecord {
    pub source: PathBuf,
    pub words: Vec<String>,
}

impl ParticipantRecord {
    /// Identifier written to the `response_file` column.
    pub fn id(&self) -> String {
        self.source.display().to_string()
    }

    /// Number of transitions between consecutive words.
    pub fn transition_count(&self) -> usize {
        self.words.len().saturating_sub(1)
    }
}

/// Lists files in `dir` whose name ends with `suffix`, sorted by path.
pub fn participant_files(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, LoadError> {
    let read_dir_err = |source| LoadError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .file_name()
            .is_some_and(|name| name.as_encoded_bytes().ends_with(suffix.as_bytes()));
        if matches {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Reads the ordered word sequence from a single participant file.
///
/// Under [`WordLayout::FirstRow`] a blank first line is an empty sequence,
/// not a reason to fall through to the next line.
pub fn read_words(path: &Path, layout: WordLayout) -> Result<Vec<String>, LoadError> {
    let contents = std::fs::read(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let blank_first_line = contents.starts_with(b"\n") || contents.starts_with(b"\r\n");
    if layout == WordLayout::FirstRow && blank_first_line {
        return Err(LoadError::EmptyFile(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(contents.as_slice());

    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let words: Vec<String> = match layout {
        WordLayout::FirstRow => match reader.records().next() {
            Some(record) => record.map_err(csv_err)?.iter().map(str::to_string).collect(),
            None => Vec::new(),
        },
        WordLayout::FirstColumn => {
            let mut words = Vec::new();
            for record in reader.records() {
                let record = record.map_err(csv_err)?;
                if let Some(first) = record.get(0) {
                    words.push(first.to_string());
                }
            }
            words
        }
    };

    if words.is_empty() {
        return Err(LoadError::EmptyFile(path.to_path_buf()));
    }

    Ok(words)
}

/// Loads every participant file in `dir` matching `suffix`.
pub fn load_participants(
    dir: &Path,
    suffix: &str,
    layout: WordLayout,
) -> Result<Vec<ParticipantRecord>, LoadError> {
    participant_files(dir, suffix)?
        .into_iter()
        .map(|source| -> Result<ParticipantRecord, LoadError> {
            let words = read_words(&source, layout)?;
            debug!(file = %source.display(), words = words.len(), "participant loaded");
            Ok(ParticipantRecord { source, words })
        })
        .collect()
}

/// Like [`load_participants`], also returning every distinct word seen.
pub fn load_participants_with_vocabulary(
    dir: &Path,
    suffix: &str,
    layout: WordLayout,
) -> Result<(Vec<ParticipantRecord>, BTreeSet<String>), LoadError> {
    let participants = load_participants(dir, suffix, layout)?;
    let vocabulary = vocabulary(&participants);
    Ok((participants, vocabulary))
}

pub fn vocabulary(participants: &[ParticipantRecord]) -> BTreeSet<String> {
    participants
        .iter()
        .flat_map(|p| p.words.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn first_row_layout_reads_only_the_first_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p1.csv");
        fs::write(&path, "cat,dog,cat\nignored,row\n").unwrap();

        let words = read_words(&path, WordLayout::FirstRow).unwrap();

        assert_eq!(words, vec!["cat", "dog", "cat"]);
    }

    #[test]
    fn first_column_layout_reads_one_word_per_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p1.csv");
        fs::write(&path, "cat,1\ndog,2\nbird\n").unwrap();

        let words = read_words(&path, WordLayout::FirstColumn).unwrap();

        assert_eq!(words, vec!["cat", "dog", "bird"]);
    }

    #[test]
    fn empty_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();

        let err = read_words(&path, WordLayout::FirstRow).unwrap_err();

        assert!(matches!(err, LoadError::EmptyFile(p) if p == path));
    }

    #[test]
    fn blank_first_line_is_an_empty_sequence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p1.csv");
        fs::write(&path, "\ncat,dog\n").unwrap();

        let err = read_words(&path, WordLayout::FirstRow).unwrap_err();

        assert!(matches!(err, LoadError::EmptyFile(p) if p == path));
        assert_eq!(
            read_words(&path, WordLayout::FirstColumn).unwrap(),
            vec!["cat"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_file_names_are_still_matched() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        let name = OsStr::from_bytes(b"p\xff.csv");
        if fs::write(dir.path().join(name), "cat,dog\n").is_err() {
            // Filesystem refuses non-UTF-8 names; nothing to check.
            return;
        }

        let files = participant_files(dir.path(), ".csv").unwrap();

        assert_eq!(files, vec![dir.path().join(name)]);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let dir = tempdir().unwrap();
        let err = read_words(&dir.path().join("nope.csv"), WordLayout::FirstRow).unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
    }

    #[test]
    fn only_matching_suffix_is_loaded_in_path_order() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.csv"), "dog\n").unwrap();
        fs::write(dir.path().join("a.csv"), "cat,dog\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "bird\n").unwrap();
        fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let participants = load_participants(dir.path(), ".csv", WordLayout::FirstRow).unwrap();

        let names: Vec<_> = participants
            .iter()
            .map(|p| p.source.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
        assert_eq!(participants[0].transition_count(), 1);
        assert_eq!(participants[1].transition_count(), 0);
    }

    #[test]
    fn vocabulary_is_the_deduplicated_union() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "cat,dog,cat\n").unwrap();
        fs::write(dir.path().join("b.csv"), "dog,bird\n").unwrap();

        let (participants, vocab) =
            load_participants_with_vocabulary(dir.path(), ".csv", WordLayout::FirstRow).unwrap();

        assert_eq!(participants.len(), 2);
        assert_eq!(
            vocab.into_iter().collect::<Vec<_>>(),
            vec!["bird", "cat", "dog"]
        );
    }

    #[test]
    fn missing_directory_is_a_read_dir_error() {
        let dir = tempdir().unwrap();
        let err = load_participants(&dir.path().join("absent"), ".csv", WordLayout::FirstRow)
            .unwrap_err();
        assert!(matches!(err, LoadError::ReadDir { .. }));
    }
}
