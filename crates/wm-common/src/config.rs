use crate::embedding::VectorFormat;
use crate::participants::WordLayout;
use crate::table::HeaderPolicy;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "Participant_Data";
pub const DEFAULT_FILE_SUFFIX: &str = ".csv";
pub const DEFAULT_MODEL_PATH: &str = "Semantic_Space/GoogleNews-vectors-negative300.bin";
pub const DEFAULT_MOVEMENT_OUTPUT: &str = "word2vec_Movement.csv";
pub const DEFAULT_EMBEDDINGS_OUTPUT: &str = "word2vec_Embeddings_All.csv";

/// Everything a movement run reads from or writes to.
///
/// Relative paths are resolved by the OS against the process working
/// directory; the library never looks the directory up itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementConfig {
    /// Directory holding one file per participant
    pub data_dir: PathBuf,
    /// Participant files are those whose name ends with this
    pub file_suffix: String,
    pub word_layout: WordLayout,
    pub model_path: PathBuf,
    pub model_format: VectorFormat,
    /// Read at most this many vectors from the model file
    pub model_limit: Option<usize>,
    pub movement_output: PathBuf,
    /// Table of raw embeddings for every distinct word; `None` skips it
    pub embeddings_output: Option<PathBuf>,
    pub header_policy: HeaderPolicy,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.into(),
            file_suffix: DEFAULT_FILE_SUFFIX.into(),
            word_layout: WordLayout::FirstRow,
            model_path: DEFAULT_MODEL_PATH.into(),
            model_format: VectorFormat::Binary,
            model_limit: None,
            movement_output: DEFAULT_MOVEMENT_OUTPUT.into(),
            embeddings_output: Some(DEFAULT_EMBEDDINGS_OUTPUT.into()),
            header_policy: HeaderPolicy::Trust,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_published_layout() {
        let config = MovementConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("Participant_Data"));
        assert_eq!(config.file_suffix, ".csv");
        assert_eq!(config.model_format, VectorFormat::Binary);
        assert_eq!(config.movement_output, PathBuf::from("word2vec_Movement.csv"));
        assert_eq!(
            config.embeddings_output,
            Some(PathBuf::from("word2vec_Embeddings_All.csv"))
        );
        assert_eq!(config.header_policy, HeaderPolicy::Trust);
    }
}
