// Timeline engine - symbolic MIDI editing between transcription and notation
// Silence trimming, voice splitting and tempo correction over immutable timelines

pub mod normalize;
pub mod rescale;
pub mod smf;
pub mod split;
pub mod types;

use thiserror::Error;

pub use normalize::{onset_offset, trim_leading_silence, trim_leading_silence_with_offset};
pub use rescale::{rescale_tempo, TempoCorrection, REFERENCE_BPM};
pub use smf::{read_timeline, write_timeline};
pub use split::{split_voices, SplitOptions};
pub use types::{
    absolute_to_delta, delta_to_absolute, Event, EventKind, MetaEvent, TimedEvent, Timeline,
    Track,
};

/// Errors raised while decoding, encoding or transforming timelines
#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("MIDI parse error: {0}")]
    Midi(#[from] midly::Error),

    #[error("Failed to write MIDI: {0}")]
    Encode(String),

    #[error("Malformed MIDI: {0}")]
    Malformed(String),

    #[error("SMPTE timecode timing is not supported, expected ticks per beat")]
    UnsupportedTiming,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TimelineResult<T> = Result<T, TimelineError>;
