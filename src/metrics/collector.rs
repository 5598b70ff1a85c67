//! Metrics collection and registry.

use crate::backend::MediaBackend;
use crate::receiver::StreamPipelineManager;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The registry rejected or failed to encode a metric.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of receiver state for metrics update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Pipeline constructed and playing.
    pub is_streaming: bool,
    /// Frames seen within the timeout window.
    pub has_active_stream: bool,
    /// Frames per second over the last check interval.
    pub fps: u32,
    /// Frames that became current.
    pub frames_received: u64,
    /// Samples dropped for bad metadata or buffers.
    pub frames_discarded: u64,
    /// Width of the current frame.
    pub frame_width: u32,
    /// Height of the current frame.
    pub frame_height: u32,
    /// Errors reported on the pipeline bus.
    pub bus_errors: u64,
}

impl MetricsSnapshot {
    /// Captures the current state of a receiver.
    pub fn from_receiver<B: MediaBackend>(receiver: &StreamPipelineManager<B>) -> Self {
        let stats = receiver.stats();
        let (frame_width, frame_height) = receiver.current_frame().size();

        Self {
            is_streaming: receiver.is_streaming(),
            has_active_stream: receiver.has_active_stream(),
            fps: receiver.fps(),
            frames_received: stats.frames_received,
            frames_discarded: stats.frames_discarded,
            frame_width,
            frame_height,
            bus_errors: stats.bus_errors,
        }
    }
}

/// Prometheus metrics registry for the receiver.
pub struct MetricsRegistry {
    registry: Registry,

    // Stream state
    streaming: IntGauge,
    active_stream: IntGauge,
    fps: IntGauge,

    // Frames
    frames_total: IntCounter,
    frames_discarded_total: IntCounter,
    frame_width: IntGauge,
    frame_height: IntGauge,

    // Pipeline
    bus_errors_total: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new registry with all receiver metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let streaming = IntGauge::new(
            "video_receiver_streaming",
            "Pipeline constructed and playing (1=yes, 0=no)",
        )?;
        let active_stream = IntGauge::new(
            "video_receiver_active_stream",
            "Frames received within the timeout window (1=yes, 0=no)",
        )?;
        let fps = IntGauge::new(
            "video_receiver_fps",
            "Frames per second over the last check interval",
        )?;

        let frames_total = IntCounter::new(
            "video_receiver_frames_total",
            "Total number of frames that became current",
        )?;
        let frames_discarded_total = IntCounter::new(
            "video_receiver_frames_discarded_total",
            "Total number of samples discarded as decode glitches",
        )?;
        let frame_width = IntGauge::new("video_receiver_frame_width", "Current frame width")?;
        let frame_height = IntGauge::new("video_receiver_frame_height", "Current frame height")?;

        let bus_errors_total = IntCounter::new(
            "video_receiver_bus_errors_total",
            "Total number of errors reported on the pipeline bus",
        )?;

        registry.register(Box::new(streaming.clone()))?;
        registry.register(Box::new(active_stream.clone()))?;
        registry.register(Box::new(fps.clone()))?;
        registry.register(Box::new(frames_total.clone()))?;
        registry.register(Box::new(frames_discarded_total.clone()))?;
        registry.register(Box::new(frame_width.clone()))?;
        registry.register(Box::new(frame_height.clone()))?;
        registry.register(Box::new(bus_errors_total.clone()))?;

        Ok(Self {
            registry,
            streaming,
            active_stream,
            fps,
            frames_total,
            frames_discarded_total,
            frame_width,
            frame_height,
            bus_errors_total,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.streaming.set(i64::from(snapshot.is_streaming));
        self.active_stream.set(i64::from(snapshot.has_active_stream));
        self.fps.set(i64::from(snapshot.fps));
        self.frame_width.set(i64::from(snapshot.frame_width));
        self.frame_height.set(i64::from(snapshot.frame_height));

        // Counters only move forward, so add the difference
        advance(&self.frames_total, snapshot.frames_received);
        advance(&self.frames_discarded_total, snapshot.frames_discarded);
        advance(&self.bus_errors_total, snapshot.bus_errors);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}
