//! Stream status as seen by the presentation layer.

use std::fmt;

/// Human-readable summary of what the receiver is doing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StreamStatus {
    /// Nothing started yet.
    #[default]
    Ready,
    /// Building the pipeline.
    Starting,
    /// Pipeline playing on the given port, no frame seen yet.
    Listening(u16),
    /// Frames are flowing.
    Receiving,
    /// Pipeline up but frames have not resumed.
    WaitingForVideo,
    /// Frames stopped arriving for longer than the timeout.
    TimedOut,
    /// The source signalled end of stream.
    Ended,
    /// A reported failure with its detail.
    Error(String),
    /// Pipeline torn down.
    Stopped,
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamStatus::Ready => f.write_str("Ready"),
            StreamStatus::Starting => f.write_str("Starting stream..."),
            StreamStatus::Listening(port) => write!(f, "Streaming on port {port}"),
            StreamStatus::Receiving => f.write_str("Streaming (receiving frames)"),
            StreamStatus::WaitingForVideo => f.write_str("Waiting for video stream..."),
            StreamStatus::TimedOut => f.write_str("No video stream (timeout)"),
            StreamStatus::Ended => f.write_str("Stream ended"),
            StreamStatus::Error(detail) => write!(f, "Error: {detail}"),
            StreamStatus::Stopped => f.write_str("Stopped"),
        }
    }
}

/// Derived receiver state.
///
/// `has_active_stream` is only ever true while `is_streaming` is true.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamState {
    /// Pipeline constructed and playing.
    pub is_streaming: bool,
    /// Frames observed within the timeout window.
    pub has_active_stream: bool,
    /// Human-readable status line.
    pub status: StreamStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages() {
        assert_eq!(StreamStatus::Ready.to_string(), "Ready");
        assert_eq!(
            StreamStatus::Listening(5000).to_string(),
            "Streaming on port 5000"
        );
        assert_eq!(
            StreamStatus::TimedOut.to_string(),
            "No video stream (timeout)"
        );
        assert_eq!(
            StreamStatus::Error("Failed to start".into()).to_string(),
            "Error: Failed to start"
        );
    }

    #[test]
    fn test_initial_state() {
        let state = StreamState::default();
        assert!(!state.is_streaming);
        assert!(!state.has_active_stream);
        assert_eq!(state.status, StreamStatus::Ready);
    }
}
