//! The streaming video receiver.
//!
//! [`StreamPipelineManager`] builds and tears down the decode pipeline,
//! marshals decoded frames from the pipeline's threads into the single
//! current-frame slot, polls the pipeline's message bus and detects loss of
//! signal independently of whether the pipeline is alive.

mod events;
mod handoff;
mod liveness;
mod manager;
mod state;
mod timer;

pub use events::ReceiverEvent;
pub use handoff::DiscardReason;
pub use liveness::{Liveness, LivenessMonitor};
pub use manager::{ReceiverStats, StreamError, StreamPipelineManager};
pub use state::{StreamState, StreamStatus};
pub use timer::IntervalTimer;
