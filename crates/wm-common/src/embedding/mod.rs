pub mod keyed_vectors;

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

pub use keyed_vectors::{KeyedVectors, ModelError, VectorFormat};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("word {word:?} is not in the model vocabulary")]
    OutOfVocabulary { word: String },
}

/// Word → vector oracle.
///
/// The movement transform only needs `lookup`; anything that can answer it
/// (a loaded word2vec file, an in-memory table in tests) can drive a run.
pub trait WordVectors {
    /// Vector width; every vector returned by `lookup` has this length.
    fn dimension(&self) -> usize;

    fn vocabulary_size(&self) -> usize;

    /// Returns the vector for `word`, or `OutOfVocabulary`. Never substitutes
    /// a default vector.
    fn lookup(&self, word: &str) -> Result<&[f32], LookupError>;

    fn contains(&self, word: &str) -> bool {
        self.lookup(word).is_ok()
    }
}

/// Vectors for a requested word set, iterated in word order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingTable {
    vectors: BTreeMap<String, Vec<f32>>,
}

impl EmbeddingTable {
    pub fn get(&self, word: &str) -> Result<&[f32], LookupError> {
        self.vectors
            .get(word)
            .map(Vec::as_slice)
            .ok_or_else(|| LookupError::OutOfVocabulary {
                word: word.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.vectors
            .iter()
            .map(|(word, vector)| (word.as_str(), vector.as_slice()))
    }
}

impl FromIterator<(String, Vec<f32>)> for EmbeddingTable {
    fn from_iter<I: IntoIterator<Item = (String, Vec<f32>)>>(iter: I) -> Self {
        Self {
            vectors: iter.into_iter().collect(),
        }
    }
}

/// Looks up every word in `words`. The first out-of-vocabulary word aborts
/// the whole lookup.
pub fn get_embeddings<'a, M, I>(model: &M, words: I) -> Result<EmbeddingTable, LookupError>
where
    M: WordVectors + ?Sized,
    I: IntoIterator<Item = &'a String>,
{
    let mut vectors = BTreeMap::new();
    for word in words {
        if vectors.contains_key(word) {
            continue;
        }
        let vector = model.lookup(word)?;
        vectors.insert(word.clone(), vector.to_vec());
    }
    debug!(words = vectors.len(), "embeddings collected");
    Ok(EmbeddingTable { vectors })
}
