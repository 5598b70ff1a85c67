//! Single-slot storage for the most recent frame.

use super::VideoFrame;
use std::sync::{Arc, PoisonError, RwLock};

/// Holds exactly one current frame.
///
/// Writes replace the whole frame by swapping an `Arc`, and reads clone that
/// `Arc`, so a reader never sees a half-written frame and the lock is only
/// ever held for a pointer copy.
#[derive(Clone)]
pub struct FrameSlot {
    current: Arc<RwLock<Arc<VideoFrame>>>,
}

impl FrameSlot {
    /// Creates a slot holding `initial`.
    pub fn new(initial: VideoFrame) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    /// Replaces the current frame.
    pub fn replace(&self, frame: VideoFrame) {
        let frame = Arc::new(frame);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = frame;
    }

    /// Returns the current frame.
    pub fn snapshot(&self) -> Arc<VideoFrame> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }
}

impl std::fmt::Debug for FrameSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSlot")
            .field("current", &self.snapshot())
            .finish()
    }
}
