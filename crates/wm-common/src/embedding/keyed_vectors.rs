use super::{LookupError, WordVectors};
use clap::ValueEnum;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Upper bound on words reserved up front; the header count is not trusted.
const MAX_PREALLOCATED_WORDS: usize = 1 << 16;

/// On-disk layout of a word2vec vector file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum VectorFormat {
    /// `"<count> <dim>\n"` then, per word, `word` + ' ' + dim little-endian f32.
    #[default]
    Binary,
    /// `"<count> <dim>\n"` then one whitespace separated `word v0 .. vN` line per word.
    Text,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid model header: {0:?}")]
    InvalidHeader(String),
    #[error("model file ended after {read} of {expected} vectors")]
    Truncated { expected: usize, read: usize },
    #[error("word #{index} is not valid utf-8")]
    InvalidWord { index: usize },
    #[error("vector for {word:?} has {found} components, expected {expected}")]
    DimensionMismatch {
        word: String,
        expected: usize,
        found: usize,
    },
    #[error("vector for {word:?} has non-numeric component {value:?}")]
    InvalidNumber { word: String, value: String },
}

/// In-memory word2vec model.
#[derive(Debug, Clone, Default)]
pub struct KeyedVectors {
    dimension: usize,
    index: HashMap<String, usize>,
    words: Vec<String>,
    vectors: Vec<f32>,
}

impl KeyedVectors {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ..Default::default()
        }
    }

    /// Builds a model from `(word, vector)` pairs, rejecting any vector whose
    /// width differs from `dimension`.
    pub fn from_entries<I>(dimension: usize, entries: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = (String, Vec<f32>)>,
    {
        let mut model = Self::new(dimension);
        for (word, vector) in entries {
            if vector.len() != dimension {
                return Err(ModelError::DimensionMismatch {
                    word,
                    expected: dimension,
                    found: vector.len(),
                });
            }
            model.insert(word, &vector);
        }
        Ok(model)
    }

    /// Loads a word2vec file, reading at most `limit` vectors when given.
    pub fn load(
        path: &Path,
        format: VectorFormat,
        limit: Option<usize>,
    ) -> Result<Self, ModelError> {
        let reader = BufReader::new(File::open(path)?);
        let model = Self::from_reader(reader, format, limit)?;
        info!(
            path = %path.display(),
            ?format,
            vocabulary = model.words.len(),
            dimension = model.dimension,
            "word vectors loaded"
        );
        Ok(model)
    }

    pub fn from_reader<R: BufRead>(
        mut reader: R,
        format: VectorFormat,
        limit: Option<usize>,
    ) -> Result<Self, ModelError> {
        let mut header = String::new();
        reader.read_line(&mut header)?;
        let (declared, dimension) = parse_header(&header)?;
        let expected = limit.map_or(declared, |limit| limit.min(declared));

        let mut model = Self::new(dimension);
        model.words.reserve(expected.min(MAX_PREALLOCATED_WORDS));

        match format {
            VectorFormat::Binary => model.read_binary(&mut reader, expected)?,
            VectorFormat::Text => model.read_text(&mut reader, expected)?,
        }

        Ok(model)
    }

    fn read_binary<R: BufRead>(
        &mut self,
        reader: &mut R,
        expected: usize,
    ) -> Result<(), ModelError> {
        // parse_header guarantees this does not overflow.
        let byte_len = self.dimension * 4;
        let mut word_bytes = Vec::new();
        let mut raw = Vec::new();
        let mut vector = Vec::new();

        for index in 0..expected {
            word_bytes.clear();
            reader.read_until(b' ', &mut word_bytes)?;
            if word_bytes.last() != Some(&b' ') {
                return Err(ModelError::Truncated {
                    expected,
                    read: index,
                });
            }
            word_bytes.pop();

            // Some writers terminate each vector with a newline.
            let start = word_bytes
                .iter()
                .position(|b| *b != b'\n' && *b != b'\r')
                .unwrap_or(word_bytes.len());
            let word = std::str::from_utf8(&word_bytes[start..])
                .map_err(|_| ModelError::InvalidWord { index })?
                .to_string();

            raw.clear();
            Read::take(&mut *reader, byte_len as u64).read_to_end(&mut raw)?;
            if raw.len() != byte_len {
                return Err(ModelError::Truncated {
                    expected,
                    read: index,
                });
            }

            vector.clear();
            vector.extend(
                raw.chunks_exact(4)
                    .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
            );
            self.insert(word, &vector);
        }

        Ok(())
    }

    fn read_text<R: BufRead>(&mut self, reader: &mut R, expected: usize) -> Result<(), ModelError> {
        let mut line = String::new();
        let mut read = 0;
        let mut vector = Vec::new();

        while read < expected {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(ModelError::Truncated { expected, read });
            }

            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };

            vector.clear();
            for value in parts {
                let parsed = value.parse::<f32>().map_err(|_| ModelError::InvalidNumber {
                    word: word.to_string(),
                    value: value.to_string(),
                })?;
                vector.push(parsed);
            }

            if vector.len() != self.dimension {
                return Err(ModelError::DimensionMismatch {
                    word: word.to_string(),
                    expected: self.dimension,
                    found: vector.len(),
                });
            }

            self.insert(word.to_string(), &vector);
            read += 1;
        }

        Ok(())
    }

    fn insert(&mut self, word: String, vector: &[f32]) {
        if self.index.contains_key(&word) {
            warn!(%word, "duplicate word in model; keeping first vector");
            return;
        }
        self.index.insert(word.clone(), self.words.len());
        self.words.push(word);
        self.vectors.extend_from_slice(vector);
    }

    /// Writes the model in word2vec `format`, in insertion order.
    pub fn save(&self, path: &Path, format: VectorFormat) -> Result<(), ModelError> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "{} {}", self.words.len(), self.dimension)?;

        let vectors = self.vectors.chunks_exact(self.dimension.max(1));
        for (word, vector) in self.words.iter().zip(vectors) {
            match format {
                VectorFormat::Binary => {
                    writer.write_all(word.as_bytes())?;
                    writer.write_all(b" ")?;
                    for value in vector {
                        writer.write_all(&value.to_le_bytes())?;
                    }
                    writer.write_all(b"\n")?;
                }
                VectorFormat::Text => {
                    write!(writer, "{word}")?;
                    for value in vector {
                        write!(writer, " {value}")?;
                    }
                    writeln!(writer)?;
                }
            }
        }

        writer.flush()?;
        Ok(())
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }
}

impl WordVectors for KeyedVectors {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn vocabulary_size(&self) -> usize {
        self.words.len()
    }

    fn lookup(&self, word: &str) -> Result<&[f32], LookupError> {
        let slot = self
            .index
            .get(word)
            .ok_or_else(|| LookupError::OutOfVocabulary {
                word: word.to_string(),
            })?;
        let start = slot * self.dimension;
        Ok(&self.vectors[start..start + self.dimension])
    }
}

fn parse_header(line: &str) -> Result<(usize, usize), ModelError> {
    let invalid = || ModelError::InvalidHeader(line.trim_end().to_string());
    let mut fields = line.split_whitespace();
    let count = fields
        .next()
        .and_then(|raw| raw.parse::<usize>().ok())
        .ok_or_else(invalid)?;
    let dimension = fields
        .next()
        .and_then(|raw| raw.parse::<usize>().ok())
        .filter(|dim| *dim > 0 && dim.checked_mul(4).is_some())
        .ok_or_else(invalid)?;
    if fields.next().is_some() {
        return Err(invalid());
    }
    Ok((count, dimension))
}
