//! Producer side of the frame hand-off.
//!
//! Runs on the pipeline's streaming thread. It never touches receiver state:
//! it copies the sample into an owned frame and posts it to the consumer.

use crate::backend::{DecodedSample, NewSampleHandler, SampleSource};
use crate::frame::{orientation, FrameError, VideoFrame};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// A decoded frame in flight to the consumer context.
#[derive(Debug)]
pub(crate) struct FrameHandoff {
    /// Pipeline the frame came from.
    pub(crate) generation: u64,
    pub(crate) frame: VideoFrame,
}

/// Why a sample was dropped instead of becoming a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscardReason {
    /// The sample carries no usable format metadata.
    #[error("sample has no parseable video caps")]
    MissingMetadata,
    /// The sample has no readable buffer.
    #[error("sample buffer could not be mapped")]
    UnmappableBuffer,
    /// The metadata does not fit the buffer.
    #[error(transparent)]
    Invalid(#[from] FrameError),
}

/// Copies one sample out of pipeline memory into a corrected frame.
///
/// The buffer mapping is released before this returns, so the caller is free
/// to release the sample right after.
pub(crate) fn extract_frame(sample: &dyn DecodedSample) -> Result<VideoFrame, DiscardReason> {
    let info = sample
        .video_info()
        .ok_or(DiscardReason::MissingMetadata)?;
    let mapped = sample
        .map_readable()
        .ok_or(DiscardReason::UnmappableBuffer)?;
    let bytes: &[u8] = AsRef::<[u8]>::as_ref(&*mapped);

    Ok(orientation::correct(bytes, &info)?)
}

/// State captured by the new-sample callback of one pipeline.
pub(crate) struct FrameProducer {
    generation: u64,
    tx: Sender<FrameHandoff>,
    discarded: Arc<AtomicU64>,
}

impl FrameProducer {
    pub(crate) fn new(generation: u64, tx: Sender<FrameHandoff>, discarded: Arc<AtomicU64>) -> Self {
        Self {
            generation,
            tx,
            discarded,
        }
    }

    pub(crate) fn into_handler(self) -> NewSampleHandler {
        Box::new(move |sink: &dyn SampleSource| self.on_new_sample(sink))
    }

    fn on_new_sample(&self, sink: &dyn SampleSource) {
        let Some(sample) = sink.pull_sample() else {
            tracing::warn!("New-sample callback fired but no sample was available");
            return;
        };

        match extract_frame(&*sample) {
            Ok(frame) => {
                tracing::trace!(
                    generation = self.generation,
                    width = frame.width(),
                    height = frame.height(),
                    "Handing off frame"
                );
                if self
                    .tx
                    .send(FrameHandoff {
                        generation: self.generation,
                        frame,
                    })
                    .is_err()
                {
                    tracing::trace!("Receiver gone, frame dropped");
                }
            }
            Err(reason) => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%reason, "Discarding frame");
            }
        }
    }
}
