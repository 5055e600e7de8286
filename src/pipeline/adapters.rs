// External collaborator interfaces
// Source acquisition, transcription, notation conversion and rendering are supplied by the host

use std::error::Error;
use std::path::{Path, PathBuf};

use crate::notation::ConverterParams;

/// Error type adapters report; the pipeline tags it with the failing boundary
pub type AdapterError = Box<dyn Error + Send + Sync>;

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Fetches a recording (URL, local file, ...) and stores it as WAV at `dest`
pub trait SourceAdapter {
    fn acquire(&self, source: &str, dest: &Path) -> AdapterResult<()>;
}

/// Turns a WAV recording into a Standard MIDI File at `dest`
pub trait Transcriber {
    fn transcribe(&self, audio: &Path, dest: &Path) -> AdapterResult<()>;
}

/// Turns a two-track MIDI file into a two-voice LilyPond document at `dest`
pub trait NotationConverter {
    fn convert(&self, midi: &Path, params: &ConverterParams, dest: &Path) -> AdapterResult<()>;
}

/// Typesets a LilyPond document; returns the path of the rendered file
pub trait Renderer {
    fn render(&self, notation: &Path, output_prefix: &Path) -> AdapterResult<PathBuf>;
}

/// The four collaborators one run needs
#[derive(Clone, Copy)]
pub struct Adapters<'a> {
    pub source: &'a dyn SourceAdapter,
    pub transcriber: &'a dyn Transcriber,
    pub converter: &'a dyn NotationConverter,
    pub renderer: &'a dyn Renderer,
}
