pub mod config;
pub mod embedding;
pub mod logging;
pub mod movement;
pub mod participants;
pub mod pipeline;
pub mod table;

pub use config::MovementConfig;
pub use embedding::{
    EmbeddingTable, KeyedVectors, LookupError, ModelError, VectorFormat, WordVectors,
};
pub use movement::MovementRecord;
pub use participants::{LoadError, ParticipantRecord, WordLayout};
pub use pipeline::{RunError, RunSummary};
pub use table::{HeaderPolicy, TableError, TableSink};
