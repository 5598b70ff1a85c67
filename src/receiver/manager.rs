//! Pipeline lifecycle, frame hand-off and liveness for one video stream.
//!
//! # Execution contexts
//!
//! The manager itself lives in a single consumer context (typically the UI
//! thread) and is the only thing that mutates receiver state. The pipeline's
//! streaming threads only ever run [`FrameProducer`], which posts owned frames
//! over a channel. The consumer applies them, in order, from [`pump`].
//!
//! [`pump`]: StreamPipelineManager::pump

use super::events::Notifier;
use super::handoff::{FrameHandoff, FrameProducer};
use super::liveness::{Liveness, LivenessMonitor};
use super::timer::Timers;
use super::{ReceiverEvent, StreamState, StreamStatus};
use crate::backend::{
    BusMessage, MediaBackend, MediaPipeline, PipelineDescription, PipelineError, PipelineState,
};
use crate::config::ReceiverConfig;
use crate::frame::{FrameId, FrameSlot, VideoFrame};
use crate::presenter::FramePresenter;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Failures of [`StreamPipelineManager::start_stream`].
///
/// None of these are fatal: the manager is left without a pipeline and
/// `start_stream` may simply be called again.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// The pipeline description could not be built.
    #[error("Failed to create pipeline: {0}")]
    Build(PipelineError),
    /// The graph was built but its sink could not be found.
    #[error("Failed to initialize: {0}")]
    SinkUnavailable(PipelineError),
    /// The pipeline refused to start playing.
    #[error("Failed to start stream: {0}")]
    Start(PipelineError),
}

impl StreamError {
    /// Detail shown after `Error: ` in the status line.
    fn status_detail(&self) -> String {
        match self {
            StreamError::Build(e) => e.to_string(),
            StreamError::SinkUnavailable(_) => "Failed to initialize".to_string(),
            StreamError::Start(_) => "Failed to start".to_string(),
        }
    }
}

/// Counters describing what the receiver has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Frames that became current.
    pub frames_received: u64,
    /// Samples dropped for bad metadata or an unmappable buffer.
    pub frames_discarded: u64,
    /// Hand-offs that arrived after their pipeline was torn down.
    pub stale_handoffs: u64,
    /// Errors popped from the bus.
    pub bus_errors: u64,
    /// Warnings popped from the bus.
    pub bus_warnings: u64,
}

struct PipelineHandle<P> {
    pipeline: P,
    port: u16,
    generation: u64,
}

/// Owns at most one decode pipeline and the latest frame it produced.
pub struct StreamPipelineManager<B: MediaBackend> {
    backend: B,
    config: ReceiverConfig,
    pipeline: Option<PipelineHandle<B::Pipeline>>,
    timers: Option<Timers>,
    state: StreamState,
    slot: FrameSlot,
    frame_id: FrameId,
    liveness: LivenessMonitor,
    handoff_tx: Sender<FrameHandoff>,
    handoff_rx: Receiver<FrameHandoff>,
    next_generation: u64,
    notifier: Notifier,
    stats: ReceiverStats,
    discarded: Arc<AtomicU64>,
    fps: u32,
    empty_polls: u64,
}

impl<B: MediaBackend> StreamPipelineManager<B> {
    /// Creates an idle manager showing the placeholder frame.
    pub fn new(backend: B, config: ReceiverConfig) -> Self {
        let placeholder =
            VideoFrame::placeholder(config.placeholder.width, config.placeholder.height);
        let liveness = LivenessMonitor::new(config.timing.frame_timeout(), Instant::now());
        let (handoff_tx, handoff_rx) = crossbeam_channel::unbounded();

        tracing::debug!(
            width = config.placeholder.width,
            height = config.placeholder.height,
            "Stream manager created with placeholder frame"
        );

        Self {
            backend,
            config,
            pipeline: None,
            timers: None,
            state: StreamState::default(),
            slot: FrameSlot::new(placeholder),
            frame_id: FrameId::PLACEHOLDER,
            liveness,
            handoff_tx,
            handoff_rx,
            next_generation: 1,
            notifier: Notifier::default(),
            stats: ReceiverStats::default(),
            discarded: Arc::new(AtomicU64::new(0)),
            fps: 0,
            empty_polls: 0,
        }
    }

    /// Builds and starts a pipeline listening on `port`.
    ///
    /// Any existing pipeline is torn down first. Failures are reported through
    /// the status line and an [`ReceiverEvent::Error`] as well as returned.
    pub fn start_stream(&mut self, port: u16) -> Result<(), StreamError> {
        tracing::debug!(port, "Starting stream");

        if self.pipeline.is_some() {
            tracing::debug!("Existing pipeline found, stopping it first");
            self.stop_stream();
        }

        self.set_status(StreamStatus::Starting);

        let description = PipelineDescription::rtp_jpeg(port, &self.config.stream);
        tracing::debug!(pipeline = %description, "Creating pipeline");

        let mut pipeline = match self.backend.build(&description) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                let error = match e {
                    PipelineError::MissingElement(_) => StreamError::SinkUnavailable(e),
                    e => StreamError::Build(e),
                };
                tracing::warn!(%error, "Pipeline construction failed");
                self.report(&error);
                return Err(error);
            }
        };

        let generation = self.next_generation;
        self.next_generation += 1;
        let producer = FrameProducer::new(
            generation,
            self.handoff_tx.clone(),
            Arc::clone(&self.discarded),
        );
        pipeline.set_new_sample_handler(producer.into_handler());

        let now = Instant::now();
        self.timers = Some(Timers::start(&self.config.timing, now));
        self.liveness.reset(now);
        self.set_has_active_stream(false);

        let started = pipeline.set_state(PipelineState::Playing);
        self.pipeline = Some(PipelineHandle {
            pipeline,
            port,
            generation,
        });

        if let Err(e) = started {
            tracing::warn!(error = %e, port, "Failed to start pipeline");
            let error = StreamError::Start(e);
            self.report(&error);
            self.stop_stream();
            return Err(error);
        }

        self.set_streaming(true);
        self.set_status(StreamStatus::Listening(port));
        tracing::info!(port, generation, "Stream started");
        Ok(())
    }

    /// Tears down the current pipeline, if any.
    ///
    /// The last frame stays in the slot.
    pub fn stop_stream(&mut self) {
        let Some(mut handle) = self.pipeline.take() else {
            tracing::debug!("No active pipeline, nothing to stop");
            return;
        };

        tracing::debug!(port = handle.port, "Stopping stream");

        // Timers go first so no tick can observe a half-released pipeline
        self.timers = None;

        let mut flushed = 0usize;
        while handle.pipeline.pop_message().is_some() {
            flushed += 1;
        }
        tracing::debug!(flushed, "Bus flushed");

        if let Err(e) = handle.pipeline.set_state(PipelineState::Null) {
            tracing::warn!(error = %e, "Failed to set pipeline to NULL state");
        }

        handle.pipeline.release_sink();
        handle.pipeline.release_bus();
        drop(handle);

        self.set_streaming(false);
        self.set_has_active_stream(false);
        self.set_fps(0);
        self.set_status(StreamStatus::Stopped);
        tracing::info!("Stream stopped");
    }

    /// Runs the consumer context once at the current time.
    ///
    /// Returns the number of frames that became current.
    pub fn pump(&mut self) -> usize {
        self.pump_at(Instant::now())
    }

    /// Runs the consumer context once as of `now`.
    ///
    /// Applies every queued hand-off in arrival order, then fires whichever
    /// control-path timers are due.
    pub fn pump_at(&mut self, now: Instant) -> usize {
        let mut applied = 0;
        while let Ok(handoff) = self.handoff_rx.try_recv() {
            if self.apply_handoff(handoff, now) {
                applied += 1;
            }
        }

        let (poll_due, timeout_due) = match self.timers.as_mut() {
            Some(timers) => (timers.bus_poll.fire(now), timers.frame_timeout.fire(now)),
            None => (false, false),
        };
        if poll_due {
            self.poll_bus();
        }
        if timeout_due {
            self.check_frame_timeout(now);
        }

        applied
    }

    fn apply_handoff(&mut self, handoff: FrameHandoff, now: Instant) -> bool {
        let live = self.pipeline.as_ref().map(|handle| handle.generation);
        if live != Some(handoff.generation) || !self.state.is_streaming {
            self.stats.stale_handoffs += 1;
            tracing::trace!(
                generation = handoff.generation,
                "Dropping frame from a torn-down pipeline"
            );
            return false;
        }

        self.slot.replace(handoff.frame);
        self.frame_id = self.frame_id.next();
        self.liveness.record_frame(now);
        self.stats.frames_received += 1;

        if !self.state.has_active_stream {
            self.set_has_active_stream(true);
            self.set_status(StreamStatus::Receiving);
        }

        self.notifier.emit(ReceiverEvent::FrameReady(self.frame_id));
        true
    }

    fn poll_bus(&mut self) {
        let Some(handle) = self.pipeline.as_mut() else {
            return;
        };

        let mut messages = Vec::new();
        while let Some(message) = handle.pipeline.pop_message() {
            messages.push(message);
        }

        if messages.is_empty() {
            self.empty_polls += 1;
            if self.empty_polls % 100 == 0 {
                tracing::debug!(polls = self.empty_polls, "No messages on bus");
            }
            return;
        }

        for (index, message) in messages.into_iter().enumerate() {
            tracing::trace!(index, kind = message.kind(), "Bus message received");
            self.handle_bus_message(message);
        }
    }

    fn handle_bus_message(&mut self, message: BusMessage) {
        match message {
            BusMessage::Error {
                source,
                message,
                debug: details,
            } => {
                self.stats.bus_errors += 1;
                tracing::warn!(
                    source = source.as_deref().unwrap_or("unknown"),
                    debug = details.as_deref().unwrap_or(""),
                    "Pipeline error: {}",
                    message
                );
                // Reported only; stopping or retrying is the caller's call
                self.set_status(StreamStatus::Error(message.clone()));
                self.notifier
                    .emit(ReceiverEvent::Error(format!("GStreamer error: {message}")));
            }
            BusMessage::Warning {
                source, message, ..
            } => {
                self.stats.bus_warnings += 1;
                tracing::warn!(
                    source = source.as_deref().unwrap_or("unknown"),
                    "Pipeline warning: {}",
                    message
                );
            }
            BusMessage::EndOfStream => {
                tracing::info!("End of stream");
                self.set_status(StreamStatus::Ended);
            }
            BusMessage::StateChanged {
                from_pipeline: true,
                old,
                current,
            } => {
                tracing::debug!(%old, %current, "Pipeline state changed");
            }
            BusMessage::StateChanged { .. } | BusMessage::Other(_) => {}
        }
    }

    fn check_frame_timeout(&mut self, now: Instant) {
        if !self.state.is_streaming || self.pipeline.is_none() {
            return;
        }

        let fps = self.liveness.sample_fps(now);
        self.set_fps(fps);

        match self.liveness.check(now) {
            Liveness::NoFrames => {
                if self.state.has_active_stream {
                    self.set_has_active_stream(false);
                    self.set_status(StreamStatus::WaitingForVideo);
                    tracing::debug!("No frames received yet");
                }
            }
            Liveness::Stale(elapsed) => {
                if self.state.has_active_stream {
                    self.set_has_active_stream(false);
                    self.set_status(StreamStatus::TimedOut);
                    tracing::info!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Stream timeout, no frames within the timeout window"
                    );
                }
            }
            Liveness::Fresh => {}
        }
    }

    fn report(&mut self, error: &StreamError) {
        self.set_status(StreamStatus::Error(error.status_detail()));
        self.notifier.emit(ReceiverEvent::Error(error.to_string()));
    }

    fn set_status(&mut self, status: StreamStatus) {
        if self.state.status != status {
            tracing::debug!(status = %status, "Status changed");
            self.state.status = status.clone();
            self.notifier.emit(ReceiverEvent::StatusChanged(status));
        }
    }

    fn set_streaming(&mut self, streaming: bool) {
        if self.state.is_streaming != streaming {
            self.state.is_streaming = streaming;
            self.notifier.emit(ReceiverEvent::StreamingChanged(streaming));
        }
    }

    fn set_has_active_stream(&mut self, active: bool) {
        if self.state.has_active_stream != active {
            self.state.has_active_stream = active;
            self.notifier.emit(ReceiverEvent::ActiveStreamChanged(active));
        }
    }

    fn set_fps(&mut self, fps: u32) {
        if self.fps != fps {
            self.fps = fps;
            self.notifier.emit(ReceiverEvent::FpsChanged(fps));
        }
    }

    /// Subscribes to notifications. Every subscriber receives every event.
    pub fn subscribe(&mut self) -> Receiver<ReceiverEvent> {
        self.notifier.subscribe()
    }

    /// Read-only view of the current frame for the presentation layer.
    pub fn presenter(&self) -> FramePresenter {
        FramePresenter::new(self.slot.clone())
    }

    /// Streaming flags and status together.
    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Current status line.
    pub fn status(&self) -> &StreamStatus {
        &self.state.status
    }

    /// Pipeline constructed and playing.
    pub fn is_streaming(&self) -> bool {
        self.state.is_streaming
    }

    /// Frames seen within the timeout window.
    pub fn has_active_stream(&self) -> bool {
        self.state.has_active_stream
    }

    /// Token of the current frame; changes exactly when a new frame lands.
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// The frame a presenter would return right now.
    pub fn current_frame(&self) -> Arc<VideoFrame> {
        self.slot.snapshot()
    }

    /// Frames per second over the last timeout-check interval.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Port of the live pipeline.
    pub fn port(&self) -> Option<u16> {
        self.pipeline.as_ref().map(|handle| handle.port)
    }

    /// Counters since the manager was created.
    pub fn stats(&self) -> ReceiverStats {
        ReceiverStats {
            frames_discarded: self.discarded.load(Ordering::Relaxed),
            ..self.stats
        }
    }

    /// Configuration the manager was created with.
    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// Backend used to build pipelines.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: MediaBackend> Drop for StreamPipelineManager<B> {
    fn drop(&mut self) {
        self.stop_stream();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockSample};
    use crate::frame::VideoInfo;
    use crate::presenter::FrameProvider;
    use std::time::Duration;

    fn manager() -> (StreamPipelineManager<MockBackend>, MockBackend) {
        let backend = MockBackend::new();
        let manager = StreamPipelineManager::new(backend.clone(), ReceiverConfig::default());
        (manager, backend)
    }

    fn solid(width: u32, height: u32, value: u8) -> MockSample {
        MockSample::rgb(width, height, vec![value; (width * height * 3) as usize])
    }

    fn drain(rx: &Receiver<ReceiverEvent>) -> Vec<ReceiverEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn test_stop_without_pipeline_is_noop() {
        let (mut manager, _backend) = manager();
        let events = manager.subscribe();

        manager.stop_stream();
        manager.stop_stream();

        assert!(!manager.is_streaming());
        assert_eq!(manager.status(), &StreamStatus::Ready);
        assert!(drain(&events).is_empty());
    }

    #[test]
    fn test_start_reports_listening() {
        let (mut manager, backend) = manager();
        let events = manager.subscribe();

        manager.start_stream(5000).unwrap();

        assert!(manager.is_streaming());
        assert!(!manager.has_active_stream());
        assert_eq!(manager.status().to_string(), "Streaming on port 5000");
        assert_eq!(manager.port(), Some(5000));
        assert!(backend.pipeline().unwrap().is_playing());
        assert_eq!(
            drain(&events),
            vec![
                ReceiverEvent::StatusChanged(StreamStatus::Starting),
                ReceiverEvent::StreamingChanged(true),
                ReceiverEvent::StatusChanged(StreamStatus::Listening(5000)),
            ]
        );
    }

    #[test]
    fn test_restart_keeps_single_pipeline() {
        let (mut manager, backend) = manager();

        manager.start_stream(5000).unwrap();
        let first = backend.pipeline().unwrap();

        manager.start_stream(5001).unwrap();
        let second = backend.pipeline().unwrap();

        assert_eq!(backend.built_pipelines(), 2);
        assert_eq!(backend.live_pipelines(), 1);
        assert_eq!(second.port(), 5001);
        assert!(second.launch_string().starts_with("udpsrc port=5001 "));
        assert!(!first.is_alive());
        assert!(first.sink_released());
        assert!(first.bus_released());
        assert_eq!(manager.port(), Some(5001));
    }

    #[test]
    fn test_stop_tears_down_and_keeps_frame() {
        let (mut manager, backend) = manager();
        manager.start_stream(5000).unwrap();
        let pipeline = backend.pipeline().unwrap();

        pipeline.push_sample(solid(2, 2, 42));
        manager.pump();
        assert!(manager.has_active_stream());
        pipeline.post_error("late error");

        manager.stop_stream();

        assert_eq!(backend.live_pipelines(), 0);
        assert!(pipeline.sink_released());
        assert!(pipeline.bus_released());
        assert!(!manager.is_streaming());
        assert!(!manager.has_active_stream());
        assert_eq!(manager.status(), &StreamStatus::Stopped);
        assert_eq!(manager.stats().bus_errors, 0);
        assert_eq!(manager.current_frame().pixels(), &[42u8; 12][..]);
        assert_eq!(manager.frame_id().count(), 1);
    }

    #[test]
    fn test_frames_are_latest_wins() {
        let (mut manager, backend) = manager();
        let presenter = manager.presenter();
        manager.start_stream(5000).unwrap();
        let pipeline = backend.pipeline().unwrap();

        let mut last_id = manager.frame_id();
        for n in 1..=5u8 {
            assert!(pipeline.push_sample(solid(4, 3, n)));
            assert_eq!(manager.pump(), 1);

            let id = manager.frame_id();
            assert!(id > last_id);
            last_id = id;

            let fetched = presenter.fetch_frame(&id);
            assert_eq!((fetched.width, fetched.height), (4, 3));
            assert!(fetched.image.pixels().iter().all(|&b| b == n));
        }
        assert_eq!(last_id.count(), 5);
        assert_eq!(manager.stats().frames_received, 5);
    }

    #[test]
    fn test_queued_frames_applied_in_order() {
        let (mut manager, backend) = manager();
        let events = manager.subscribe();
        manager.start_stream(5000).unwrap();
        let pipeline = backend.pipeline().unwrap();
        drain(&events);

        let producer = std::thread::spawn(move || {
            for n in 1..=10u8 {
                pipeline.push_sample(solid(2, 2, n));
            }
        });
        producer.join().unwrap();

        assert_eq!(manager.pump(), 10);
        assert_eq!(manager.frame_id().count(), 10);
        assert!(manager.current_frame().pixels().iter().all(|&b| b == 10));

        let ready: Vec<u64> = drain(&events)
            .into_iter()
            .filter_map(|event| match event {
                ReceiverEvent::FrameReady(id) => Some(id.count()),
                _ => None,
            })
            .collect();
        assert_eq!(ready, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_first_frame_activates_stream() {
        let (mut manager, backend) = manager();
        let events = manager.subscribe();
        manager.start_stream(5000).unwrap();
        drain(&events);

        backend.pipeline().unwrap().push_sample(solid(2, 2, 1));
        manager.pump();

        assert!(manager.has_active_stream());
        assert_eq!(manager.status().to_string(), "Streaming (receiving frames)");
        assert_eq!(
            drain(&events),
            vec![
                ReceiverEvent::ActiveStreamChanged(true),
                ReceiverEvent::StatusChanged(StreamStatus::Receiving),
                ReceiverEvent::FrameReady(FrameId::PLACEHOLDER.next()),
            ]
        );
    }

    #[test]
    fn test_timeout_clears_active_stream() {
        let (mut manager, backend) = manager();
        manager.start_stream(5000).unwrap();
        let pipeline = backend.pipeline().unwrap();
        let t0 = Instant::now();

        pipeline.push_sample(solid(2, 2, 1));
        manager.pump_at(t0);
        assert!(manager.has_active_stream());

        manager.pump_at(t0 + Duration::from_secs(2));
        assert!(manager.has_active_stream());

        manager.pump_at(t0 + Duration::from_secs(5));
        assert!(!manager.has_active_stream());
        assert!(manager.is_streaming());
        assert_eq!(manager.status().to_string(), "No video stream (timeout)");

        // Sender comes back
        pipeline.push_sample(solid(2, 2, 2));
        manager.pump_at(t0 + Duration::from_secs(6));
        assert!(manager.has_active_stream());
        assert_eq!(manager.status(), &StreamStatus::Receiving);
    }

    #[test]
    fn test_timeout_never_fires_without_frames() {
        let (mut manager, _backend) = manager();
        manager.start_stream(5000).unwrap();

        manager.pump_at(Instant::now() + Duration::from_secs(10));

        assert!(!manager.has_active_stream());
        assert_eq!(manager.status(), &StreamStatus::Listening(5000));
    }

    #[test]
    fn test_active_stream_without_frames_waits_for_video() {
        let (mut manager, _backend) = manager();
        let events = manager.subscribe();
        manager.start_stream(5000).unwrap();
        let t0 = Instant::now();

        // Active flag left over with no frame recorded since the last reset
        manager.set_has_active_stream(true);
        manager.liveness.reset(t0);
        drain(&events);

        manager.pump_at(t0 + Duration::from_secs(1));

        assert!(!manager.has_active_stream());
        assert!(manager.is_streaming());
        assert_eq!(manager.status().to_string(), "Waiting for video stream...");
        let events = drain(&events);
        assert!(events.contains(&ReceiverEvent::ActiveStreamChanged(false)));
        assert!(events.contains(&ReceiverEvent::StatusChanged(StreamStatus::WaitingForVideo)));
    }

    #[test]
    fn test_fps_sampled_on_timeout_tick() {
        let (mut manager, backend) = manager();
        let events = manager.subscribe();
        manager.start_stream(5000).unwrap();
        let pipeline = backend.pipeline().unwrap();
        let t0 = Instant::now();

        for n in 0..5 {
            pipeline.push_sample(solid(2, 2, n));
        }
        manager.pump_at(t0);
        manager.pump_at(t0 + Duration::from_secs(1));

        assert_eq!(manager.fps(), 5);
        assert!(drain(&events).contains(&ReceiverEvent::FpsChanged(5)));

        manager.stop_stream();
        assert_eq!(manager.fps(), 0);
    }

    #[test]
    fn test_placeholder_before_first_frame() {
        let (manager, _backend) = manager();

        let fetched = manager.presenter().fetch_frame(&manager.frame_id());

        assert!(manager.frame_id().is_placeholder());
        assert_eq!((fetched.width, fetched.height), (640, 480));
        assert!(fetched.image.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_bus_error_reported_and_recoverable() {
        let (mut manager, backend) = manager();
        let events = manager.subscribe();
        manager.start_stream(5000).unwrap();
        drain(&events);

        backend
            .pipeline()
            .unwrap()
            .post_error("Internal data stream error.");
        manager.pump_at(Instant::now() + Duration::from_millis(100));

        assert_eq!(
            manager.status().to_string(),
            "Error: Internal data stream error."
        );
        assert!(drain(&events).contains(&ReceiverEvent::Error(
            "GStreamer error: Internal data stream error.".to_string()
        )));
        // Reported, not torn down
        assert!(manager.is_streaming());
        assert_eq!(backend.live_pipelines(), 1);
        assert_eq!(manager.stats().bus_errors, 1);

        manager.stop_stream();
        manager.start_stream(5000).unwrap();
        assert!(manager.is_streaming());
        assert_eq!(manager.status(), &StreamStatus::Listening(5000));
    }

    #[test]
    fn test_warning_and_state_changes_leave_status() {
        let (mut manager, backend) = manager();
        manager.start_stream(5000).unwrap();
        backend.pipeline().unwrap().post(BusMessage::Warning {
            source: None,
            message: "buffers dropped".into(),
            debug: None,
        });

        manager.pump_at(Instant::now() + Duration::from_millis(100));

        assert_eq!(manager.status(), &StreamStatus::Listening(5000));
        assert_eq!(manager.stats().bus_warnings, 1);
        assert_eq!(backend.pipeline().unwrap().pending_messages(), 0);
    }

    #[test]
    fn test_end_of_stream_status() {
        let (mut manager, backend) = manager();
        manager.start_stream(5000).unwrap();
        backend.pipeline().unwrap().post(BusMessage::EndOfStream);

        manager.pump_at(Instant::now() + Duration::from_millis(100));

        assert_eq!(manager.status().to_string(), "Stream ended");
        assert!(manager.is_streaming());
    }

    #[test]
    fn test_build_failure_leaves_no_pipeline() {
        let (mut manager, backend) = manager();
        let events = manager.subscribe();
        backend.fail_next_build(PipelineError::Parse("no element \"rtpjpegdepay\"".into()));

        let result = manager.start_stream(5000);

        assert!(matches!(result, Err(StreamError::Build(_))));
        assert_eq!(
            manager.status().to_string(),
            "Error: no element \"rtpjpegdepay\""
        );
        assert!(drain(&events).contains(&ReceiverEvent::Error(
            "Failed to create pipeline: no element \"rtpjpegdepay\"".to_string()
        )));
        assert!(!manager.is_streaming());
        assert_eq!(manager.port(), None);
        assert_eq!(backend.live_pipelines(), 0);

        manager.start_stream(5000).unwrap();
        assert!(manager.is_streaming());
    }

    #[test]
    fn test_missing_sink_reports_initialize_failure() {
        let (mut manager, backend) = manager();
        backend.fail_next_build(PipelineError::MissingElement("sink".into()));

        let result = manager.start_stream(5000);

        assert!(matches!(result, Err(StreamError::SinkUnavailable(_))));
        assert_eq!(manager.status().to_string(), "Error: Failed to initialize");
        assert_eq!(backend.live_pipelines(), 0);
    }

    #[test]
    fn test_play_failure_tears_down() {
        let (mut manager, backend) = manager();
        let events = manager.subscribe();
        backend.fail_next_play("Could not get/set settings from/on resource.");

        let result = manager.start_stream(5000);

        assert!(matches!(result, Err(StreamError::Start(_))));
        assert_eq!(backend.live_pipelines(), 0);
        assert!(!manager.is_streaming());
        assert_eq!(manager.status(), &StreamStatus::Stopped);

        // Reported first, then torn down through the normal stop path
        let events = drain(&events);
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], ReceiverEvent::StatusChanged(StreamStatus::Starting));
        assert_eq!(
            events[1],
            ReceiverEvent::StatusChanged(StreamStatus::Error("Failed to start".to_string()))
        );
        assert!(
            matches!(&events[2], ReceiverEvent::Error(msg) if msg.starts_with("Failed to start stream"))
        );
        assert_eq!(events[3], ReceiverEvent::StatusChanged(StreamStatus::Stopped));

        manager.start_stream(5001).unwrap();
        assert_eq!(manager.port(), Some(5001));
    }

    #[test]
    fn test_glitched_samples_are_dropped_silently() {
        let (mut manager, backend) = manager();
        let events = manager.subscribe();
        manager.start_stream(5000).unwrap();
        let pipeline = backend.pipeline().unwrap();
        drain(&events);

        pipeline.push_sample(MockSample::without_caps(vec![0; 12]));
        pipeline.push_sample(MockSample::without_buffer(VideoInfo::rgb(2, 2)));
        pipeline.push_sample(MockSample::with_info(VideoInfo::rgb_with_stride(2, 2, 3), vec![0; 12]));
        pipeline.push_spurious_wakeup();

        assert_eq!(manager.pump(), 0);
        assert!(manager.frame_id().is_placeholder());
        assert_eq!(manager.stats().frames_discarded, 3);
        assert!(drain(&events).is_empty());
    }

    #[test]
    fn test_stale_handoff_after_stop_is_ignored() {
        let (mut manager, backend) = manager();
        manager.start_stream(5000).unwrap();
        let pipeline = backend.pipeline().unwrap();

        pipeline.push_sample(solid(2, 2, 9));
        manager.stop_stream();
        manager.pump();

        assert!(manager.frame_id().is_placeholder());
        assert!(!manager.has_active_stream());
        assert_eq!(manager.stats().stale_handoffs, 1);
    }

    #[test]
    fn test_handoff_from_replaced_pipeline_is_ignored() {
        let (mut manager, backend) = manager();
        manager.start_stream(5000).unwrap();
        let old = backend.pipeline().unwrap();
        old.push_sample(solid(2, 2, 1));

        manager.start_stream(5001).unwrap();
        backend.pipeline().unwrap().push_sample(solid(2, 2, 2));

        assert_eq!(manager.pump(), 1);
        assert!(manager.current_frame().pixels().iter().all(|&b| b == 2));
    }

    #[test]
    fn test_frame_is_orientation_corrected() {
        let (mut manager, backend) = manager();
        manager.start_stream(5000).unwrap();

        // 2x2: top-left red, top-right green, bottom-left blue, bottom-right white
        let raw = vec![
            255, 0, 0, 0, 255, 0, //
            0, 0, 255, 255, 255, 255,
        ];
        backend
            .pipeline()
            .unwrap()
            .push_sample(MockSample::rgb(2, 2, raw));
        manager.pump();

        let frame = manager.current_frame();
        assert_eq!(frame.pixel(0, 0), Some([255, 255, 255]));
        assert_eq!(frame.pixel(1, 0), Some([0, 0, 255]));
        assert_eq!(frame.pixel(0, 1), Some([0, 255, 0]));
        assert_eq!(frame.pixel(1, 1), Some([255, 0, 0]));
    }

    #[test]
    fn test_drop_stops_pipeline() {
        let (mut manager, backend) = manager();
        manager.start_stream(5000).unwrap();
        assert_eq!(backend.live_pipelines(), 1);

        drop(manager);

        assert_eq!(backend.live_pipelines(), 0);
    }
}
