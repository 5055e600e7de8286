// Run artifact storage
// Numbered intermediate files in one output directory, each recorded with its SHA256

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Expected artifact was not produced: {0}")]
    MissingArtifact(PathBuf),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Intermediate and final files of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    RawAudio,
    Transcription,
    Trimmed,
    DurationAdjusted,
    Split,
    Notation,
    ParallelNotation,
    SheetMusic,
}

impl ArtifactKind {
    /// File name inside the run directory; numbered so a listing reads in pipeline order
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::RawAudio => "1_raw_audio.wav",
            ArtifactKind::Transcription => "2_transcription.midi",
            ArtifactKind::Trimmed => "2_transcription_trimmed.midi",
            ArtifactKind::DurationAdjusted => "2_transcription_duration_adjusted.midi",
            ArtifactKind::Split => "2_transcription_split.midi",
            ArtifactKind::Notation => "3_lilypond.ly",
            ArtifactKind::ParallelNotation => "3_lilypond_parallel.ly",
            // Output prefix; the renderer appends its own extension
            ArtifactKind::SheetMusic => "4_sheet_music",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: u64,
}

/// Output directory of one run plus the artifacts recorded so far
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    artifacts: Vec<Artifact>,
}

impl ArtifactStore {
    /// Open (creating if needed) a run directory
    pub fn create(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(ArtifactStore {
            root,
            artifacts: Vec::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where an artifact of this kind lives
    pub fn path_for(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    /// Write bytes as an artifact and record its hash
    pub fn store(&mut self, kind: ArtifactKind, data: &[u8]) -> StorageResult<Artifact> {
        let path = self.path_for(kind);
        let mut file = fs::File::create(&path)?;
        file.write_all(data)?;

        Ok(self.record(kind, path, data))
    }

    /// Record a file some adapter wrote at the kind's default location
    pub fn register(&mut self, kind: ArtifactKind) -> StorageResult<Artifact> {
        let path = self.path_for(kind);
        self.register_path(kind, path)
    }

    /// Record a file written somewhere else (e.g. the renderer's `.pdf`)
    pub fn register_path(&mut self, kind: ArtifactKind, path: PathBuf) -> StorageResult<Artifact> {
        if !path.is_file() {
            return Err(StorageError::MissingArtifact(path));
        }
        let data = fs::read(&path)?;
        Ok(self.record(kind, path, &data))
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn into_artifacts(self) -> Vec<Artifact> {
        self.artifacts
    }

    fn record(&mut self, kind: ArtifactKind, path: PathBuf, data: &[u8]) -> Artifact {
        let artifact = Artifact {
            kind,
            path,
            sha256: calculate_sha256(data),
            bytes: data.len() as u64,
        };
        log::debug!(
            "Recorded {:?} artifact {} ({} bytes)",
            kind,
            artifact.path.display(),
            artifact.bytes
        );
        self.artifacts.push(artifact.clone());
        artifact
    }
}

/// Calculate SHA256 hash of data
pub fn calculate_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
