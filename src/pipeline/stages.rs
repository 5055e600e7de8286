// Pipeline stages and adapter boundaries

use std::fmt;

use serde::{Deserialize, Serialize};

/// Steps of one performance-to-score run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Acquire,
    Transcribe,
    TrimSilence,
    RescaleTempo,
    SplitVoices,
    Convert,
    Interleave,
    Render,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Acquire,
        Stage::Transcribe,
        Stage::TrimSilence,
        Stage::RescaleTempo,
        Stage::SplitVoices,
        Stage::Convert,
        Stage::Interleave,
        Stage::Render,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Acquire => "acquire",
            Stage::Transcribe => "transcribe",
            Stage::TrimSilence => "trim_silence",
            Stage::RescaleTempo => "rescale_tempo",
            Stage::SplitVoices => "split_voices",
            Stage::Convert => "convert",
            Stage::Interleave => "interleave",
            Stage::Render => "render",
        }
    }

    /// Overall run progress once this stage has finished
    pub fn progress(&self) -> f32 {
        let index = Stage::ALL.iter().position(|s| s == self).unwrap_or(0);
        (index + 1) as f32 / Stage::ALL.len() as f32
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External collaborators the pipeline hands work to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    Source,
    Transcription,
    Conversion,
    Rendering,
}

impl Boundary {
    pub fn as_str(&self) -> &'static str {
        match self {
            Boundary::Source => "source",
            Boundary::Transcription => "transcription",
            Boundary::Conversion => "conversion",
            Boundary::Rendering => "rendering",
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
