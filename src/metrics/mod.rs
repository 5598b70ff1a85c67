//! Prometheus metrics exporter for the video receiver.
//!
//! # Metrics Exposed
//!
//! ## Stream State
//! - `video_receiver_streaming` - Pipeline constructed and playing (1/0)
//! - `video_receiver_active_stream` - Frames seen within the timeout (1/0)
//! - `video_receiver_fps` - Frames per second over the last check interval
//!
//! ## Frames
//! - `video_receiver_frames_total` - Frames that became current
//! - `video_receiver_frames_discarded_total` - Samples dropped as decode glitches
//! - `video_receiver_frame_width` / `video_receiver_frame_height` - Current frame size
//!
//! ## Pipeline
//! - `video_receiver_bus_errors_total` - Errors reported on the pipeline bus
//!
//! # Example
//!
//! ```no_run
//! use rtp_video_receiver::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     is_streaming: true,
//!     has_active_stream: true,
//!     fps: 30,
//!     frames_received: 900,
//!     frames_discarded: 2,
//!     frame_width: 1280,
//!     frame_height: 720,
//!     bus_errors: 0,
//! };
//!
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
