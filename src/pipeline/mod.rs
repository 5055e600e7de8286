// Pipeline execution and monitoring module
// Orchestrates one recording through every stage, storing artifacts and tracing progress

pub mod adapters;
pub mod config;
pub mod runner;
pub mod stages;
pub mod storage;
pub mod trace;

use thiserror::Error;

use crate::notation::NotationError;
use crate::timeline::TimelineError;

pub use adapters::{
    AdapterError, AdapterResult, Adapters, NotationConverter, Renderer, SourceAdapter, Transcriber,
};
pub use config::PipelineConfig;
pub use runner::{Pipeline, RunReport, TRACE_FILE};
pub use stages::{Boundary, Stage};
pub use storage::{calculate_sha256, Artifact, ArtifactKind, ArtifactStore, StorageError};
pub use trace::{read_trace_file, StageStatus, TraceBuilder, TraceEntry, TraceError, TraceWriter};

/// Anything that aborts a run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{boundary} adapter failed: {source}")]
    Boundary {
        boundary: Boundary,
        #[source]
        source: AdapterError,
    },

    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Notation(#[from] NotationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Adapter that failed, if the run died at a boundary
    pub fn boundary(&self) -> Option<Boundary> {
        match self {
            PipelineError::Boundary { boundary, .. } => Some(*boundary),
            _ => None,
        }
    }
}
