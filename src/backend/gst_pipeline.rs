//! GStreamer implementation of the media backend.
//!
//! Requires the system GStreamer libraries with the `udpsrc`, `rtpjpegdepay`,
//! `jpegdec`, `videoconvert` and `appsink` elements available.

use super::{
    BusMessage, DecodedSample, MediaBackend, MediaPipeline, NewSampleHandler, PipelineDescription,
    PipelineError, PipelineState, SampleSource, SINK_NAME,
};
use crate::frame::{PixelFormat, VideoInfo};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;

/// Builds pipelines through `gst_parse_launch`.
#[derive(Debug)]
pub struct GstBackend {
    _initialized: (),
}

impl GstBackend {
    /// Initializes GStreamer. Safe to call more than once.
    pub fn new() -> Result<Self, PipelineError> {
        gst::init().map_err(|e| PipelineError::Init(e.to_string()))?;
        tracing::info!(version = %gst::version_string(), "GStreamer initialized");
        Ok(Self { _initialized: () })
    }
}

impl MediaBackend for GstBackend {
    type Pipeline = GstPipeline;

    fn build(&self, description: &PipelineDescription) -> Result<GstPipeline, PipelineError> {
        let launch = description.to_launch_string();
        tracing::debug!(pipeline = %launch, "Parsing pipeline description");

        let pipeline = gst::parse::launch(&launch)
            .map_err(|e| PipelineError::Parse(e.to_string()))?
            .downcast::<gst::Pipeline>()
            .map_err(|_| PipelineError::Parse("description did not produce a pipeline".into()))?;

        let sink = pipeline
            .by_name(SINK_NAME)
            .and_then(|element| element.downcast::<gst_app::AppSink>().ok())
            .ok_or_else(|| PipelineError::MissingElement(SINK_NAME.to_string()))?;

        let bus = pipeline
            .bus()
            .ok_or_else(|| PipelineError::MissingElement("bus".to_string()))?;

        Ok(GstPipeline {
            pipeline,
            sink: Some(sink),
            bus: Some(bus),
        })
    }
}

/// A parsed GStreamer pipeline with its application sink and bus.
pub struct GstPipeline {
    pipeline: gst::Pipeline,
    sink: Option<gst_app::AppSink>,
    bus: Option<gst::Bus>,
}

impl MediaPipeline for GstPipeline {
    fn set_new_sample_handler(&mut self, mut handler: NewSampleHandler) {
        let Some(sink) = &self.sink else {
            tracing::warn!("Sink already released, new-sample handler not installed");
            return;
        };

        sink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let source = AppSinkSource { sink: appsink };
                    handler(&source as &dyn SampleSource);
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );
    }

    fn set_state(&mut self, state: PipelineState) -> Result<(), PipelineError> {
        self.pipeline
            .set_state(to_gst_state(state))
            .map(|_| ())
            .map_err(|e| PipelineError::StateChange {
                target: state,
                reason: e.to_string(),
            })
    }

    fn pop_message(&mut self) -> Option<BusMessage> {
        let message = self.bus.as_ref()?.pop()?;
        Some(convert_message(&message, &self.pipeline))
    }

    fn release_sink(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.set_callbacks(gst_app::AppSinkCallbacks::builder().build());
        }
    }

    fn release_bus(&mut self) {
        self.bus.take();
    }
}

struct AppSinkSource<'a> {
    sink: &'a gst_app::AppSink,
}

impl SampleSource for AppSinkSource<'_> {
    fn pull_sample(&self) -> Option<Box<dyn DecodedSample + '_>> {
        let sample = self.sink.pull_sample().ok()?;
        Some(Box::new(GstSample(sample)))
    }
}

struct GstSample(gst::Sample);

struct MappedBuffer<'a>(gst::BufferMap<'a, gst::buffer::Readable>);

impl AsRef<[u8]> for MappedBuffer<'_> {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl DecodedSample for GstSample {
    fn video_info(&self) -> Option<VideoInfo> {
        let caps = self.0.caps()?;
        let info = gst_video::VideoInfo::from_caps(caps).ok()?;
        let format = match info.format() {
            gst_video::VideoFormat::Rgb => PixelFormat::Rgb8,
            _ => PixelFormat::Unsupported,
        };
        let stride = usize::try_from(*info.stride().first()?).ok()?;

        Some(VideoInfo {
            width: info.width(),
            height: info.height(),
            stride,
            format,
        })
    }

    fn map_readable(&self) -> Option<Box<dyn AsRef<[u8]> + '_>> {
        let map = self.0.buffer()?.map_readable().ok()?;
        Some(Box::new(MappedBuffer(map)))
    }
}

fn convert_message(message: &gst::Message, pipeline: &gst::Pipeline) -> BusMessage {
    use gst::MessageView;

    let source = message.src().map(|src| src.path_string().to_string());
    match message.view() {
        MessageView::Error(err) => BusMessage::Error {
            source,
            message: err.error().to_string(),
            debug: err.debug().map(|d| d.to_string()),
        },
        MessageView::Warning(warning) => BusMessage::Warning {
            source,
            message: warning.error().to_string(),
            debug: warning.debug().map(|d| d.to_string()),
        },
        MessageView::Eos(_) => BusMessage::EndOfStream,
        MessageView::StateChanged(change) => BusMessage::StateChanged {
            from_pipeline: message
                .src()
                .is_some_and(|src| src == pipeline.upcast_ref::<gst::Object>()),
            old: from_gst_state(change.old()),
            current: from_gst_state(change.current()),
        },
        _ => BusMessage::Other(format!("{:?}", message.type_())),
    }
}

fn to_gst_state(state: PipelineState) -> gst::State {
    match state {
        PipelineState::Pending => gst::State::VoidPending,
        PipelineState::Null => gst::State::Null,
        PipelineState::Ready => gst::State::Ready,
        PipelineState::Paused => gst::State::Paused,
        PipelineState::Playing => gst::State::Playing,
    }
}

fn from_gst_state(state: gst::State) -> PipelineState {
    match state {
        gst::State::Null => PipelineState::Null,
        gst::State::Ready => PipelineState::Ready,
        gst::State::Paused => PipelineState::Paused,
        gst::State::Playing => PipelineState::Playing,
        _ => PipelineState::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_mapping_round_trips() {
        for state in [
            PipelineState::Null,
            PipelineState::Ready,
            PipelineState::Paused,
            PipelineState::Playing,
        ] {
            assert_eq!(from_gst_state(to_gst_state(state)), state);
        }
    }
}
