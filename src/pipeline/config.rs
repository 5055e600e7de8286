// Pipeline configuration
// Typed settings for every stage, loadable from a JSON file

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{PipelineError, PipelineResult};
use crate::notation::{ConverterParams, InterleaveOptions};
use crate::timeline::{SplitOptions, TempoCorrection};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub split: SplitOptions,

    /// Known performance tempo; `None` keeps the transcriber's timing
    pub tempo: Option<TempoCorrection>,

    pub converter: ConverterParams,

    pub interleave: InterleaveOptions,

    /// Write `trace.jsonl` into the run directory
    pub trace: bool,
}

impl PipelineConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config: PipelineConfig =
            serde_json::from_str(&contents).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject bad parameters before any stage runs
    ///
    /// Converter parameters are validated when they are parsed, so they cannot
    /// be invalid here.
    pub fn validate(&self) -> PipelineResult<()> {
        self.split.validate()?;
        if let Some(tempo) = &self.tempo {
            tempo.validate()?;
        }
        if self.interleave.voice_markers.iter().any(String::is_empty)
            || self.interleave.score_marker.is_empty()
        {
            return Err(PipelineError::Config(
                "voice and score markers must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
