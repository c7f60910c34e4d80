use crate::embedding::{EmbeddingTable, LookupError};
use crate::participants::ParticipantRecord;

pub const MOVEMENT_BASE_COLUMNS: [&str; 5] =
    ["response_file", "series", "numTransition", "word1", "word2"];

/// One transition between consecutive words of a participant's sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementRecord {
    pub response_file: String,
    pub series: String,
    pub transition: usize,
    pub word1: String,
    pub word2: String,
    /// `embedding(word2) - embedding(word1)`
    pub movement: Vec<f32>,
}

impl MovementRecord {
    /// Cells in `movement_header` order.
    pub fn to_row(&self) -> Vec<String> {
        let mut row = Vec::with_capacity(MOVEMENT_BASE_COLUMNS.len() + self.movement.len());
        row.push(self.response_file.clone());
        row.push(self.series.clone());
        row.push(self.transition.to_string());
        row.push(self.word1.clone());
        row.push(self.word2.clone());
        row.extend(self.movement.iter().map(f32::to_string));
        row
    }
}

/// Element-wise `to - from`.
pub fn difference(from: &[f32], to: &[f32]) -> Vec<f32> {
    debug_assert_eq!(from.len(), to.len());
    to.iter().zip(from).map(|(b, a)| b - a).collect()
}

/// Differences between consecutive embeddings of `series`; `len - 1` vectors,
/// none for a single word.
pub fn movements(table: &EmbeddingTable, series: &[String]) -> Result<Vec<Vec<f32>>, LookupError> {
    series
        .windows(2)
        .map(|pair| -> Result<Vec<f32>, LookupError> {
            Ok(difference(table.get(&pair[0])?, table.get(&pair[1])?))
        })
        .collect()
}

pub fn movement_records(
    participant: &ParticipantRecord,
    table: &EmbeddingTable,
) -> Result<Vec<MovementRecord>, LookupError> {
    let response_file = participant.id();
    let series = participant.words.join(" ");

    let vectors = movements(table, &participant.words)?;
    Ok(participant
        .words
        .windows(2)
        .zip(vectors)
        .enumerate()
        .map(|(transition, (pair, movement))| MovementRecord {
            response_file: response_file.clone(),
            series: series.clone(),
            transition,
            word1: pair[0].clone(),
            word2: pair[1].clone(),
            movement,
        })
        .collect())
}

pub fn movement_header(dimension: usize) -> Vec<String> {
    MOVEMENT_BASE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain((0..dimension).map(|i| format!("movement_{i}")))
        .collect()
}

pub fn embedding_header(dimension: usize) -> Vec<String> {
    std::iter::once("word".to_string())
        .chain((0..dimension).map(|i| format!("dimension_{i}")))
        .collect()
}

/// Cells in `embedding_header` order.
pub fn embedding_row(word: &str, vector: &[f32]) -> Vec<String> {
    std::iter::once(word.to_string())
        .chain(vector.iter().map(f32::to_string))
        .collect()
}
