//! In-process pipeline for tests and demonstrations.
//!
//! `MockBackend` builds pipelines that behave like an application-sink graph
//! without touching the network: the test side plays the streaming thread by
//! pushing samples through a [`MockPipelineHandle`], which invokes the
//! installed new-sample callback exactly as the real sink would.

use super::{
    BusMessage, DecodedSample, MediaBackend, MediaPipeline, NewSampleHandler, PipelineDescription,
    PipelineError, PipelineState, SampleSource,
};
use crate::frame::VideoInfo;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A synthetic decoded sample.
#[derive(Debug, Clone)]
pub struct MockSample {
    info: Option<VideoInfo>,
    data: Option<Vec<u8>>,
}

impl MockSample {
    /// Tightly packed RGB sample.
    pub fn rgb(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::with_info(VideoInfo::rgb(width, height), data)
    }

    /// Sample with arbitrary metadata.
    pub fn with_info(info: VideoInfo, data: Vec<u8>) -> Self {
        Self {
            info: Some(info),
            data: Some(data),
        }
    }

    /// Sample whose caps are missing.
    pub fn without_caps(data: Vec<u8>) -> Self {
        Self {
            info: None,
            data: Some(data),
        }
    }

    /// Sample whose buffer cannot be mapped.
    pub fn without_buffer(info: VideoInfo) -> Self {
        Self {
            info: Some(info),
            data: None,
        }
    }
}

impl DecodedSample for MockSample {
    fn video_info(&self) -> Option<VideoInfo> {
        self.info
    }

    fn map_readable(&self) -> Option<Box<dyn AsRef<[u8]> + '_>> {
        let data: &[u8] = self.data.as_deref()?;
        Some(Box::new(data))
    }
}

/// State shared between a mock pipeline and its handles.
struct MockLink {
    port: u16,
    launch: String,
    state: Mutex<PipelineState>,
    handler: Mutex<Option<NewSampleHandler>>,
    bus: Mutex<VecDeque<BusMessage>>,
    pending: Mutex<VecDeque<MockSample>>,
    alive: AtomicBool,
    sink_released: AtomicBool,
    bus_released: AtomicBool,
}

struct MockSink<'a> {
    link: &'a MockLink,
}

impl SampleSource for MockSink<'_> {
    fn pull_sample(&self) -> Option<Box<dyn DecodedSample + '_>> {
        let sample = lock(&self.link.pending).pop_front()?;
        Some(Box::new(sample))
    }
}

#[derive(Default)]
struct MockShared {
    built: u64,
    live: usize,
    fail_next_build: Option<PipelineError>,
    fail_next_play: Option<String>,
    latest: Option<Arc<MockLink>>,
}

/// Scriptable backend producing [`MockPipeline`]s.
#[derive(Clone, Default)]
pub struct MockBackend {
    shared: Arc<Mutex<MockShared>>,
}

impl MockBackend {
    /// Creates a backend with no pipelines and no scripted failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `build` call fail with `error`.
    pub fn fail_next_build(&self, error: PipelineError) {
        lock(&self.shared).fail_next_build = Some(error);
    }

    /// Makes the next pipeline refuse to enter the playing state.
    pub fn fail_next_play(&self, reason: impl Into<String>) {
        lock(&self.shared).fail_next_play = Some(reason.into());
    }

    /// Handle to the most recently built pipeline, if it is still alive.
    pub fn pipeline(&self) -> Option<MockPipelineHandle> {
        let shared = lock(&self.shared);
        let link = shared.latest.as_ref()?;
        link.alive.load(Ordering::Acquire).then(|| MockPipelineHandle {
            link: Arc::clone(link),
        })
    }

    /// Number of pipelines built and not yet dropped.
    pub fn live_pipelines(&self) -> usize {
        lock(&self.shared).live
    }

    /// Number of pipelines ever built successfully.
    pub fn built_pipelines(&self) -> u64 {
        lock(&self.shared).built
    }
}

impl MediaBackend for MockBackend {
    type Pipeline = MockPipeline;

    fn build(&self, description: &PipelineDescription) -> Result<MockPipeline, PipelineError> {
        let mut shared = lock(&self.shared);
        if let Some(error) = shared.fail_next_build.take() {
            return Err(error);
        }

        let link = Arc::new(MockLink {
            port: description.port(),
            launch: description.to_launch_string(),
            state: Mutex::new(PipelineState::Null),
            handler: Mutex::new(None),
            bus: Mutex::new(VecDeque::new()),
            pending: Mutex::new(VecDeque::new()),
            alive: AtomicBool::new(true),
            sink_released: AtomicBool::new(false),
            bus_released: AtomicBool::new(false),
        });

        shared.built += 1;
        shared.live += 1;
        shared.latest = Some(Arc::clone(&link));
        tracing::debug!(port = description.port(), "MockBackend built pipeline");

        Ok(MockPipeline {
            link,
            shared: Arc::clone(&self.shared),
            fail_play: shared.fail_next_play.take(),
        })
    }
}

/// Pipeline produced by [`MockBackend`].
pub struct MockPipeline {
    link: Arc<MockLink>,
    shared: Arc<Mutex<MockShared>>,
    fail_play: Option<String>,
}

impl MediaPipeline for MockPipeline {
    fn set_new_sample_handler(&mut self, handler: NewSampleHandler) {
        *lock(&self.link.handler) = Some(handler);
    }

    fn set_state(&mut self, state: PipelineState) -> Result<(), PipelineError> {
        if state == PipelineState::Playing {
            if let Some(reason) = self.fail_play.take() {
                return Err(PipelineError::StateChange {
                    target: state,
                    reason,
                });
            }
        }

        let old = std::mem::replace(&mut *lock(&self.link.state), state);
        if !self.link.bus_released.load(Ordering::Acquire) {
            let mut bus = lock(&self.link.bus);
            // A child stage reports first, as a real bin does
            bus.push_back(BusMessage::StateChanged {
                from_pipeline: false,
                old,
                current: state,
            });
            bus.push_back(BusMessage::StateChanged {
                from_pipeline: true,
                old,
                current: state,
            });
        }
        Ok(())
    }

    fn pop_message(&mut self) -> Option<BusMessage> {
        if self.link.bus_released.load(Ordering::Acquire) {
            return None;
        }
        lock(&self.link.bus).pop_front()
    }

    fn release_sink(&mut self) {
        lock(&self.link.handler).take();
        self.link.sink_released.store(true, Ordering::Release);
    }

    fn release_bus(&mut self) {
        lock(&self.link.bus).clear();
        self.link.bus_released.store(true, Ordering::Release);
    }
}

impl Drop for MockPipeline {
    fn drop(&mut self) {
        self.link.alive.store(false, Ordering::Release);
        let mut shared = lock(&self.shared);
        shared.live = shared.live.saturating_sub(1);
    }
}

/// Test-side view of a mock pipeline: plays the streaming thread and the bus.
///
/// Handles are `Send`, so samples can be pushed from a separate thread.
#[derive(Clone)]
pub struct MockPipelineHandle {
    link: Arc<MockLink>,
}

impl MockPipelineHandle {
    /// Queues `sample` on the sink and fires the new-sample callback.
    ///
    /// Returns `false` if the pipeline is not playing or has no callback.
    pub fn push_sample(&self, sample: MockSample) -> bool {
        if !self.is_playing() {
            return false;
        }
        lock(&self.link.pending).push_back(sample);
        self.fire_new_sample()
    }

    /// Fires the new-sample callback with nothing queued.
    pub fn push_spurious_wakeup(&self) -> bool {
        self.is_playing() && self.fire_new_sample()
    }

    fn fire_new_sample(&self) -> bool {
        let mut handler = lock(&self.link.handler);
        match handler.as_mut() {
            Some(handler) => {
                let sink = MockSink { link: &self.link };
                handler(&sink as &dyn SampleSource);
                true
            }
            None => {
                lock(&self.link.pending).clear();
                false
            }
        }
    }

    /// Posts a message on the pipeline's bus.
    pub fn post(&self, message: BusMessage) {
        if !self.link.bus_released.load(Ordering::Acquire) {
            lock(&self.link.bus).push_back(message);
        }
    }

    /// Posts an error message as a failing stage would.
    pub fn post_error(&self, message: impl Into<String>) {
        self.post(BusMessage::Error {
            source: Some("udpsrc0".to_string()),
            message: message.into(),
            debug: None,
        });
    }

    /// Port the pipeline was built for.
    pub fn port(&self) -> u16 {
        self.link.port
    }

    /// The description the pipeline was built from.
    pub fn launch_string(&self) -> &str {
        &self.link.launch
    }

    /// Last state the pipeline was moved to.
    pub fn state(&self) -> PipelineState {
        *lock(&self.link.state)
    }

    /// True while the pipeline is in the playing state.
    pub fn is_playing(&self) -> bool {
        self.is_alive() && self.state() == PipelineState::Playing
    }

    /// False once the owner dropped the pipeline.
    pub fn is_alive(&self) -> bool {
        self.link.alive.load(Ordering::Acquire)
    }

    /// True once the owner released the sink.
    pub fn sink_released(&self) -> bool {
        self.link.sink_released.load(Ordering::Acquire)
    }

    /// True once the owner released the bus.
    pub fn bus_released(&self) -> bool {
        self.link.bus_released.load(Ordering::Acquire)
    }

    /// Messages still queued on the bus.
    pub fn pending_messages(&self) -> usize {
        lock(&self.link.bus).len()
    }
}
