//! Pull-based access to the current frame for the presentation layer.

use crate::frame::{FrameId, FrameSlot, VideoFrame};
use std::sync::Arc;

/// A frame handed to the presentation layer.
#[derive(Debug, Clone)]
pub struct PresentedFrame {
    /// Shared handle to the frame; no pixels are copied.
    pub image: Arc<VideoFrame>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Serves the current frame on request.
pub trait FrameProvider {
    /// Returns the current frame and its dimensions.
    ///
    /// `id` lets callers key requests by the token they last saw; there is
    /// only ever one current frame, so it does not select anything.
    fn fetch_frame(&self, id: &FrameId) -> PresentedFrame;
}

/// Read-only view of a receiver's frame slot.
///
/// Cheap to clone and safe to move to another thread. Fetching never blocks
/// on frame delivery and never copies pixel data.
#[derive(Debug, Clone)]
pub struct FramePresenter {
    slot: FrameSlot,
}

impl FramePresenter {
    pub(crate) fn new(slot: FrameSlot) -> Self {
        Self { slot }
    }
}

impl FrameProvider for FramePresenter {
    fn fetch_frame(&self, _id: &FrameId) -> PresentedFrame {
        let image = self.slot.snapshot();
        let (width, height) = image.size();
        PresentedFrame {
            image,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_does_not_select_history() {
        let slot = FrameSlot::new(VideoFrame::placeholder(8, 8));
        let presenter = FramePresenter::new(slot.clone());

        slot.replace(VideoFrame::from_rgb(vec![5u8; 12], 2, 2).unwrap());

        let stale = presenter.fetch_frame(&FrameId::PLACEHOLDER);
        let current = presenter.fetch_frame(&FrameId::PLACEHOLDER.next());
        assert_eq!(stale.image, current.image);
        assert_eq!((current.width, current.height), (2, 2));
    }

    #[test]
    fn test_presenter_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FramePresenter>();
    }
}
