use crate::config::MovementConfig;
use crate::embedding::{get_embeddings, KeyedVectors, LookupError, ModelError, WordVectors};
use crate::movement::{embedding_header, embedding_row, movement_header, movement_records};
use crate::participants::{load_participants_with_vocabulary, LoadError};
use crate::table::{TableError, TableSink};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, info_span};
use ulid::Ulid;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("failed to load word vectors: {0}")]
    Model(#[from] ModelError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Table(#[from] TableError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub participants: usize,
    pub movement_rows: usize,
    /// Distinct words across all participants
    pub distinct_words: usize,
    pub embedding_rows: usize,
    pub dimension: usize,
    pub model_vocabulary: usize,
}

/// Loads the model named by `config` and runs the batch.
pub fn run_from_config(config: &MovementConfig) -> Result<RunSummary, RunError> {
    let model = KeyedVectors::load(&config.model_path, config.model_format, config.model_limit)?;
    run(config, &model)
}

/// Writes movement rows for every participant, then (when configured) the raw
/// embedding of every distinct word.
///
/// Any failure stops the run; rows appended before it stay on disk.
pub fn run(config: &MovementConfig, model: &dyn WordVectors) -> Result<RunSummary, RunError> {
    let run_id = Ulid::new().to_string();
    let started_at = Utc::now();
    let span = info_span!("movement_run", %run_id);
    let _guard = span.enter();

    let (participants, words) = load_participants_with_vocabulary(
        &config.data_dir,
        &config.file_suffix,
        config.word_layout,
    )?;
    info!(
        data_dir = %config.data_dir.display(),
        participants = participants.len(),
        distinct_words = words.len(),
        "participants loaded"
    );

    let dimension = model.dimension();
    let mut movement_sink = TableSink::new(
        &config.movement_output,
        movement_header(dimension),
        config.header_policy,
    );

    for participant in &participants {
        let table = get_embeddings(model, &participant.words)?;
        let records = movement_records(participant, &table)?;
        for record in &records {
            movement_sink.append(&record.to_row())?;
        }
        debug!(
            participant = %participant.source.display(),
            transitions = records.len(),
            "movements written"
        );
    }
    let movement_rows = movement_sink.finish();

    let mut embedding_rows = 0;
    if let Some(path) = &config.embeddings_output {
        let table = get_embeddings(model, &words)?;
        let mut sink = TableSink::new(path, embedding_header(dimension), config.header_policy);
        for (word, vector) in table.iter() {
            sink.append(&embedding_row(word, vector))?;
        }
        embedding_rows = sink.finish();
    }

    let summary = RunSummary {
        run_id,
        started_at,
        finished_at: Utc::now(),
        participants: participants.len(),
        movement_rows,
        distinct_words: words.len(),
        embedding_rows,
        dimension,
        model_vocabulary: model.vocabulary_size(),
    };
    info!(
        movement_rows = summary.movement_rows,
        embedding_rows = summary.embedding_rows,
        "movement run complete"
    );
    Ok(summary)
}
