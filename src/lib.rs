// Scorecraft - Piano performance to sheet music
// Timeline editing and notation layout between an ML transcriber and a LilyPond typesetter

pub mod notation;
pub mod pipeline;
pub mod timeline;

pub use notation::{
    bars, interleave, transform_to_parallel, Bar, ConverterParams, InterleaveOptions,
    NotationError, VoiceDocument,
};
pub use pipeline::{Adapters, Pipeline, PipelineConfig, PipelineError, RunReport};
pub use timeline::{
    rescale_tempo, split_voices, trim_leading_silence, Event, EventKind, SplitOptions,
    TempoCorrection, Timeline, TimelineError, Track,
};
