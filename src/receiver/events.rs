//! Outbound notifications to the presentation layer.

use super::StreamStatus;
use crate::frame::FrameId;
use crossbeam_channel::{Receiver, Sender};

/// Something the presentation layer may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverEvent {
    /// A new frame became current; re-fetch it from the presenter.
    FrameReady(FrameId),
    /// The pipeline started or stopped.
    StreamingChanged(bool),
    /// The status line changed.
    StatusChanged(StreamStatus),
    /// Frames started or stopped flowing.
    ActiveStreamChanged(bool),
    /// The measured frame rate changed.
    FpsChanged(u32),
    /// A reportable failure, as human-readable text.
    Error(String),
}

/// Fans events out to every live subscriber.
#[derive(Debug, Default)]
pub(crate) struct Notifier {
    subscribers: Vec<Sender<ReceiverEvent>>,
}

impl Notifier {
    pub(crate) fn subscribe(&mut self) -> Receiver<ReceiverEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Sends `event` to all subscribers, forgetting those that hung up.
    pub(crate) fn emit(&mut self, event: ReceiverEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
