//! RTP/JPEG Video Receiver Library
//!
//! Receives a JPEG-over-RTP video stream on a UDP port, decodes it through an
//! external media pipeline and keeps exactly one current frame available to a
//! presentation layer. Loss of signal is detected independently of whether
//! the pipeline is still alive.
//!
//! # Architecture
//!
//! ```text
//! backend (pipeline threads) → receiver (consumer context) → presenter
//!        ↓ bus messages              ↓ events                  ↓
//!                               status / liveness          current frame
//! ```
//!
//! # Design Principles
//!
//! - **Single writer**: only the consumer context mutates receiver state
//! - **Latest frame wins**: no frame history is kept
//! - **Liveness over pipeline health**: a playing pipeline with no frames
//!   still counts as lost signal
//!
//! # Example
//!
//! ```no_run
//! use rtp_video_receiver::{
//!     backend::MockBackend,
//!     config::ReceiverConfig,
//!     presenter::FrameProvider,
//!     receiver::{ReceiverEvent, StreamPipelineManager},
//! };
//!
//! let mut receiver = StreamPipelineManager::new(MockBackend::new(), ReceiverConfig::default());
//! let events = receiver.subscribe();
//! let presenter = receiver.presenter();
//!
//! receiver.start_stream(5000).unwrap();
//!
//! loop {
//!     receiver.pump();
//!     for event in events.try_iter() {
//!         if let ReceiverEvent::FrameReady(id) = event {
//!             let frame = presenter.fetch_frame(&id);
//!             println!("{} is {}x{}", id, frame.width, frame.height);
//!         }
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod backend;
pub mod config;
pub mod frame;
pub mod metrics;
pub mod presenter;
pub mod receiver;

// Re-export commonly used types at crate root
pub use backend::{MediaBackend, MediaPipeline, MockBackend, PipelineDescription};
pub use config::{ConfigError, ReceiverConfig};
pub use frame::{FrameId, VideoFrame};
pub use presenter::{FramePresenter, FrameProvider, PresentedFrame};
pub use receiver::{ReceiverEvent, StreamError, StreamPipelineManager, StreamStatus};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
