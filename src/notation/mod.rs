// Notation - text transforms over the converter's LilyPond output
// Bar tokenizing, parallel-music interleaving and converter parameters

pub mod bars;
pub mod parallel;
pub mod params;

use std::path::PathBuf;
use thiserror::Error;

pub use bars::{bars, Bar, Bars};
pub use parallel::{
    interleave, parallel_output_path, transform_to_parallel, InterleaveOptions, VoiceDocument,
};
pub use params::{
    ConverterParams, KeyMode, KeySignatureEntry, KeySignatureMap, Quantization,
    TimeSignatureEntry, TimeSignatureMap,
};

/// Errors raised while reading or restructuring notation documents
#[derive(Debug, Error)]
pub enum NotationError {
    #[error("Notation file not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported notation document: missing {0}")]
    MissingMarker(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type NotationResult<T> = Result<T, NotationError>;
