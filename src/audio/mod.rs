pub mod decoder;
pub mod output;
pub mod worker;

use crate::error::DecodeError;
use std::path::Path;

pub use decoder::{FrameSource, SampleEncoding, StreamInfo, SymphoniaSource};
pub use output::{NullOutput, OutputSink, RodioOutput};
pub use worker::{DecodeWorker, SourceOpener};

/// A successfully loaded file, tagged with the generation that identifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub generation: u64,
    pub info: StreamInfo,
}

/// Posted once per session when the worker stops producing frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub generation: u64,
    pub reached_natural_end: bool,
}

/// Control surface the playback controller drives.
///
/// Only `load` waits on the engine; the other calls return immediately.
pub trait AudioEngine {
    /// Opens `path` as a new session, superseding any previous one. The new
    /// session stays idle until `go`.
    fn load(&mut self, path: &Path) -> Result<Session, DecodeError>;
    fn go(&mut self);
    fn hold(&mut self);
    fn cancel(&mut self);
    fn poll_completion(&mut self) -> Option<Completion>;
}
