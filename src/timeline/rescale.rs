// Tempo correction
// Rescales durations recorded at the transcriber's assumed tempo to a known target BPM

use serde::{Deserialize, Serialize};

use super::types::{Event, EventKind, Timeline, Track, MAX_TEMPO};
use super::{TimelineError, TimelineResult};

/// Tempo the transcription model assumes when it emits ticks
pub const REFERENCE_BPM: f64 = 120.0;

/// A known performance tempo and the tempo the timeline was written at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoCorrection {
    /// Tempo the piece is actually played at
    pub target_bpm: f64,

    /// Tempo the upstream transcriber assumed
    #[serde(default = "default_reference_bpm")]
    pub reference_bpm: f64,
}

fn default_reference_bpm() -> f64 {
    REFERENCE_BPM
}

impl TempoCorrection {
    /// Correction against the default 120 BPM reference
    pub fn new(target_bpm: f64) -> TimelineResult<Self> {
        Self::with_reference(target_bpm, REFERENCE_BPM)
    }

    pub fn with_reference(target_bpm: f64, reference_bpm: f64) -> TimelineResult<Self> {
        let correction = TempoCorrection {
            target_bpm,
            reference_bpm,
        };
        correction.validate()?;
        Ok(correction)
    }

    /// Both tempos must be finite and strictly positive
    pub fn validate(&self) -> TimelineResult<()> {
        for (label, bpm) in [("target", self.target_bpm), ("reference", self.reference_bpm)] {
            if !bpm.is_finite() || bpm <= 0.0 {
                return Err(TimelineError::InvalidParameter(format!(
                    "{} BPM must be positive, got {}",
                    label, bpm
                )));
            }
        }
        Ok(())
    }

    /// Scale factor `target / reference`
    pub fn ratio(&self) -> f64 {
        self.target_bpm / self.reference_bpm
    }

    /// Correction that undoes this one
    pub fn inverse(&self) -> Self {
        TempoCorrection {
            target_bpm: self.reference_bpm,
            reference_bpm: self.target_bpm,
        }
    }
}

/// Multiply every delta by the ratio and divide every tempo by it
///
/// Both results truncate toward zero. The tempo events' own deltas are scaled
/// like any other event.
pub fn rescale_tempo(timeline: &Timeline, correction: &TempoCorrection) -> TimelineResult<Timeline> {
    correction.validate()?;
    let ratio = correction.ratio();

    let tracks = timeline
        .tracks
        .iter()
        .map(|track| {
            Track::new(
                track
                    .events
                    .iter()
                    .map(|event| Event::new(scale_delta(event.delta, ratio), scale_kind(&event.kind, ratio)))
                    .collect(),
            )
        })
        .collect();

    log::info!(
        "Rescaled timeline from {} to {} BPM (ratio {:.4})",
        correction.reference_bpm,
        correction.target_bpm,
        ratio
    );

    Ok(Timeline::new(timeline.ticks_per_beat, tracks))
}

fn scale_delta(delta: u32, ratio: f64) -> u32 {
    // `as` truncates toward zero and saturates at u32::MAX
    (f64::from(delta) * ratio) as u32
}

fn scale_kind(kind: &EventKind, ratio: f64) -> EventKind {
    match kind {
        EventKind::TempoChange { micros_per_beat } => {
            let scaled = (f64::from(*micros_per_beat) / ratio) as u32;
            if scaled > MAX_TEMPO {
                log::warn!("Rescaled tempo {} exceeds 24 bits, clamping", scaled);
            } else if scaled == 0 {
                log::warn!("Rescaled tempo {} truncated to zero, clamping to 1", micros_per_beat);
            }
            EventKind::TempoChange {
                micros_per_beat: scaled.clamp(1, MAX_TEMPO),
            }
        }
        other => other.clone(),
    }
}
