//! Media pipeline abstraction.
//!
//! Depacketizing and decoding are delegated to an external stage graph. This
//! module defines the small surface the receiver needs from it, so the
//! receiver can run against the real GStreamer graph or an in-process mock.
//!
//! The contract mirrors how an application-sink graph behaves:
//! - the graph is built from a [`PipelineDescription`];
//! - decoded samples are announced through a callback on a pipeline-owned
//!   thread, and the callback pulls them from the sink;
//! - errors, warnings and state changes are queued on a message bus that the
//!   owner drains without blocking.

mod description;
#[cfg(feature = "gstreamer")]
mod gst_pipeline;
mod mock;

pub use description::{PipelineDescription, Stage, SINK_NAME};
#[cfg(feature = "gstreamer")]
pub use gst_pipeline::{GstBackend, GstPipeline};
pub use mock::{MockBackend, MockPipeline, MockPipelineHandle, MockSample};

use crate::frame::VideoInfo;
use std::fmt;
use thiserror::Error;

/// Errors raised by a media backend.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// The media library could not be initialized.
    #[error("media library initialization failed: {0}")]
    Init(String),
    /// The description did not parse into a pipeline.
    #[error("{0}")]
    Parse(String),
    /// A required named element is absent from the graph.
    #[error("pipeline has no element named '{0}'")]
    MissingElement(String),
    /// The pipeline refused a state transition.
    #[error("failed to change pipeline state to {target}: {reason}")]
    StateChange {
        /// State that was requested.
        target: PipelineState,
        /// Failure reported by the pipeline.
        reason: String,
    },
}

/// Lifecycle states of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No state or a transition still pending.
    Pending,
    /// Initial state; no resources held.
    Null,
    /// Resources allocated, no data flowing.
    Ready,
    /// Prerolled and ready to play.
    Paused,
    /// Data flowing.
    Playing,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Pending => "VOID_PENDING",
            PipelineState::Null => "NULL",
            PipelineState::Ready => "READY",
            PipelineState::Paused => "PAUSED",
            PipelineState::Playing => "PLAYING",
        };
        f.write_str(name)
    }
}

/// A message popped from the pipeline's bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusMessage {
    /// A stage failed.
    Error {
        /// Path of the element that posted the message.
        source: Option<String>,
        /// Human-readable description.
        message: String,
        /// Extra detail for developers.
        debug: Option<String>,
    },
    /// A stage reported a recoverable problem.
    Warning {
        /// Path of the element that posted the message.
        source: Option<String>,
        /// Human-readable description.
        message: String,
        /// Extra detail for developers.
        debug: Option<String>,
    },
    /// The source signalled the end of the stream.
    EndOfStream,
    /// An element changed state.
    StateChanged {
        /// True when the top-level pipeline, not a child stage, changed state.
        from_pipeline: bool,
        /// State before the change.
        old: PipelineState,
        /// State after the change.
        current: PipelineState,
    },
    /// Any other message kind, by name.
    Other(String),
}

impl BusMessage {
    /// Short name of the message kind, for logging.
    pub fn kind(&self) -> &str {
        match self {
            BusMessage::Error { .. } => "error",
            BusMessage::Warning { .. } => "warning",
            BusMessage::EndOfStream => "eos",
            BusMessage::StateChanged { .. } => "state-changed",
            BusMessage::Other(kind) => kind,
        }
    }
}

/// A decoded sample pulled from the sink.
///
/// Both accessors may fail on a lossy stream; the receiver treats either
/// failure as a dropped frame.
pub trait DecodedSample {
    /// Format metadata, or `None` if missing or unparseable.
    fn video_info(&self) -> Option<VideoInfo>;

    /// Maps the sample's buffer for reading.
    ///
    /// The mapping borrows the sample and is released when dropped, so the
    /// bytes cannot outlive the sample.
    fn map_readable(&self) -> Option<Box<dyn AsRef<[u8]> + '_>>;
}

/// The sink, as seen from inside the new-sample callback.
pub trait SampleSource {
    /// Pulls the next decoded sample, if any is queued.
    fn pull_sample(&self) -> Option<Box<dyn DecodedSample + '_>>;
}

/// Callback invoked on the pipeline's streaming thread for each new sample.
pub type NewSampleHandler = Box<dyn FnMut(&dyn SampleSource) + Send + 'static>;

/// A constructed pipeline owned by the receiver.
///
/// Dropping the pipeline releases the graph and every stage in it.
pub trait MediaPipeline {
    /// Installs the frame-arrival callback on the sink.
    fn set_new_sample_handler(&mut self, handler: NewSampleHandler);

    /// Requests a state transition.
    fn set_state(&mut self, state: PipelineState) -> Result<(), PipelineError>;

    /// Pops one pending bus message without blocking.
    fn pop_message(&mut self) -> Option<BusMessage>;

    /// Drops the receiver's reference to the sink and its callback.
    fn release_sink(&mut self);

    /// Drops the receiver's reference to the message bus.
    fn release_bus(&mut self);
}

/// Factory for pipelines.
pub trait MediaBackend {
    /// Pipeline type this backend builds.
    type Pipeline: MediaPipeline;

    /// Builds (but does not start) a pipeline from a description.
    fn build(&self, description: &PipelineDescription) -> Result<Self::Pipeline, PipelineError>;
}
