// Pipeline runner
// Drives a recording through acquisition, transcription, timeline edits, conversion and rendering

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::adapters::{AdapterError, Adapters};
use super::config::PipelineConfig;
use super::stages::{Boundary, Stage};
use super::storage::{Artifact, ArtifactKind, ArtifactStore};
use super::trace::{TraceBuilder, TraceWriter};
use super::{PipelineError, PipelineResult};
use crate::notation::transform_to_parallel;
use crate::timeline::{read_timeline, rescale_tempo, split_voices, trim_leading_silence_with_offset};

/// Trace file name inside the run directory
pub const TRACE_FILE: &str = "trace.jsonl";

/// Summary of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub output_dir: PathBuf,

    /// Ticks of leading silence removed from the transcription
    pub onset_offset: u64,

    pub upper_notes: usize,
    pub lower_notes: usize,

    /// Rendered score
    pub sheet_music: PathBuf,

    /// Every artifact in the order it was produced
    pub artifacts: Vec<Artifact>,
}

/// One configured pipeline; reusable across recordings
pub struct Pipeline<'a> {
    config: PipelineConfig,
    adapters: Adapters<'a>,
}

fn at_boundary(boundary: Boundary) -> impl FnOnce(AdapterError) -> PipelineError {
    move |source| PipelineError::Boundary { boundary, source }
}

/// Run one stage, recording start and outcome in the trace
fn traced<T>(
    trace: Option<&TraceWriter>,
    stage: Stage,
    body: impl FnOnce() -> PipelineResult<(T, serde_json::Value)>,
) -> PipelineResult<T> {
    log::info!("Stage {} started", stage);
    if let Some(writer) = trace {
        writer.write(&TraceBuilder::stage(stage).start(format!("Starting {}", stage)))?;
    }

    match body() {
        Ok((value, data)) => {
            if let Some(writer) = trace {
                writer.write(
                    &TraceBuilder::stage(stage)
                        .complete(format!("Finished {}", stage))
                        .with_data(data),
                )?;
            }
            Ok(value)
        }
        Err(err) => {
            log::error!("Stage {} failed: {}", stage, err);
            if let Some(writer) = trace {
                if let Err(trace_err) = writer.write(&TraceBuilder::stage(stage).failed(err.to_string())) {
                    log::warn!("Could not record failure of {}: {}", stage, trace_err);
                }
            }
            Err(err)
        }
    }
}

fn describe(artifact: &Artifact) -> serde_json::Value {
    json!({
        "artifact": artifact.path.display().to_string(),
        "bytes": artifact.bytes,
        "sha256": artifact.sha256,
    })
}

impl<'a> Pipeline<'a> {
    /// Validates the configuration up front so no stage runs with bad parameters
    pub fn new(config: PipelineConfig, adapters: Adapters<'a>) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Pipeline { config, adapters })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one recording into `output_dir`
    ///
    /// Stops at the first failing stage. Artifacts written before the failure
    /// stay on disk.
    pub fn run(&self, source: &str, output_dir: &Path) -> PipelineResult<RunReport> {
        let mut store = ArtifactStore::create(output_dir)?;
        let trace = self
            .config
            .trace
            .then(|| TraceWriter::new(store.root().join(TRACE_FILE)));
        let trace = trace.as_ref();

        let audio_path = store.path_for(ArtifactKind::RawAudio);
        traced(trace, Stage::Acquire, || {
            self.adapters
                .source
                .acquire(source, &audio_path)
                .map_err(at_boundary(Boundary::Source))?;
            let artifact = store.register(ArtifactKind::RawAudio)?;
            Ok(((), describe(&artifact)))
        })?;

        let midi_path = store.path_for(ArtifactKind::Transcription);
        traced(trace, Stage::Transcribe, || {
            self.adapters
                .transcriber
                .transcribe(&audio_path, &midi_path)
                .map_err(at_boundary(Boundary::Transcription))?;
            let artifact = store.register(ArtifactKind::Transcription)?;
            Ok(((), describe(&artifact)))
        })?;

        let (mut timeline, offset) = traced(trace, Stage::TrimSilence, || {
            let raw = read_timeline(&midi_path)?;
            let (trimmed, offset) = trim_leading_silence_with_offset(&raw);
            let artifact = store.store(ArtifactKind::Trimmed, &trimmed.to_smf_bytes()?)?;

            let mut data = describe(&artifact);
            data["offset_ticks"] = json!(offset);
            Ok(((trimmed, offset), data))
        })?;

        if let Some(correction) = &self.config.tempo {
            timeline = traced(trace, Stage::RescaleTempo, || {
                let rescaled = rescale_tempo(&timeline, correction)?;
                let artifact = store.store(ArtifactKind::DurationAdjusted, &rescaled.to_smf_bytes()?)?;

                let mut data = describe(&artifact);
                data["ratio"] = json!(correction.ratio());
                Ok((rescaled, data))
            })?;
        } else {
            log::info!("No target tempo configured, keeping transcribed timing");
        }

        let (split_path, upper_notes, lower_notes) = traced(trace, Stage::SplitVoices, || {
            let voices = split_voices(&timeline, &self.config.split)?;
            let upper = voices.tracks[0].note_count();
            let lower = voices.tracks[1].note_count();
            let artifact = store.store(ArtifactKind::Split, &voices.to_smf_bytes()?)?;

            let mut data = describe(&artifact);
            data["upper_notes"] = json!(upper);
            data["lower_notes"] = json!(lower);
            Ok(((artifact.path, upper, lower), data))
        })?;

        let notation_path = store.path_for(ArtifactKind::Notation);
        traced(trace, Stage::Convert, || {
            self.adapters
                .converter
                .convert(&split_path, &self.config.converter, &notation_path)
                .map_err(at_boundary(Boundary::Conversion))?;
            let artifact = store.register(ArtifactKind::Notation)?;
            Ok(((), describe(&artifact)))
        })?;

        let parallel_path = traced(trace, Stage::Interleave, || {
            let path = transform_to_parallel(&notation_path, &self.config.interleave)?;
            let artifact = store.register_path(ArtifactKind::ParallelNotation, path)?;
            Ok((artifact.path.clone(), describe(&artifact)))
        })?;

        let output_prefix = store.path_for(ArtifactKind::SheetMusic);
        let sheet_music = traced(trace, Stage::Render, || {
            let rendered = self
                .adapters
                .renderer
                .render(&parallel_path, &output_prefix)
                .map_err(at_boundary(Boundary::Rendering))?;
            let artifact = store.register_path(ArtifactKind::SheetMusic, rendered)?;
            Ok((artifact.path.clone(), describe(&artifact)))
        })?;

        log::info!("Sheet music written to {}", sheet_music.display());

        Ok(RunReport {
            output_dir: store.root().to_path_buf(),
            onset_offset: offset,
            upper_notes,
            lower_notes,
            sheet_music,
            artifacts: store.into_artifacts(),
        })
    }
}
