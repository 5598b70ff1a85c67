//! Decoded video frames and the single current-frame slot.
//!
//! Frames leave the decode pipeline as borrowed, possibly padded buffers.
//! This module owns everything that happens after the copy: the normalized
//! RGB frame type, the fixed orientation correction, the frame token handed
//! to the presentation layer, and the slot the latest frame lives in.

mod id;
pub mod orientation;
mod slot;
mod video;

pub use id::FrameId;
pub use slot::FrameSlot;
pub use video::{FrameError, PixelFormat, VideoFrame, VideoInfo};
