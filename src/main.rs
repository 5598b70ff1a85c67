//! RTP/JPEG Video Receiver CLI
//!
//! Runs the receiver's consumer loop and logs what the presentation layer
//! would be told. Built without the `gstreamer` feature it drives a mock
//! pipeline fed by a synthetic producer that goes quiet part way through.

use clap::Parser;
use rtp_video_receiver::{
    backend::MediaBackend,
    config::ReceiverConfig,
    presenter::{FramePresenter, FrameProvider},
    receiver::{ReceiverEvent, StreamPipelineManager},
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

const PUMP_INTERVAL: Duration = Duration::from_millis(10);
const METRICS_PUBLISH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Parser)]
#[command(name = "rtp-video-receiver", version, about = "RTP/JPEG video receiver")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// UDP port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(short, long)]
    duration: Option<u64>,

    /// Prometheus exporter port, 0 to disable (needs the `metrics` feature)
    #[arg(long)]
    metrics_port: Option<u16>,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    info!("RTP Video Receiver v{}", rtp_video_receiver::VERSION);

    let mut config = match &args.config {
        Some(path) => match ReceiverConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => ReceiverConfig::default(),
    };
    if let Some(port) = args.port {
        config.stream.port = port;
    }
    if let Some(port) = args.metrics_port {
        config.metrics.port = port;
    }
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst)) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    let exporter = Exporter::spawn(config.metrics.port);

    #[cfg(feature = "gstreamer")]
    {
        let backend = match rtp_video_receiver::backend::GstBackend::new() {
            Ok(backend) => backend,
            Err(e) => {
                eprintln!("Failed to initialize GStreamer: {}", e);
                std::process::exit(1);
            }
        };
        let deadline = args.duration.map(|secs| Instant::now() + Duration::from_secs(secs));
        let mut receiver = StreamPipelineManager::new(backend, config);
        run(&mut receiver, deadline, &running, exporter.as_ref());
    }

    #[cfg(not(feature = "gstreamer"))]
    demo::run_mock(config, args.duration, &running, exporter.as_ref());
}

/// Pumps the receiver until Ctrl-C or `deadline`, logging its notifications.
fn run<B: MediaBackend>(
    receiver: &mut StreamPipelineManager<B>,
    deadline: Option<Instant>,
    running: &AtomicBool,
    exporter: Option<&Exporter>,
) {
    let events = receiver.subscribe();
    let presenter = receiver.presenter();
    let port = receiver.config().stream.port;

    if let Err(e) = receiver.start_stream(port) {
        warn!(error = %e, "Stream did not start");
    }

    let mut last_publish = Instant::now();
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if deadline.is_some_and(|deadline| now >= deadline) {
            info!("Run duration elapsed");
            break;
        }

        receiver.pump_at(now);
        for event in events.try_iter() {
            log_event(&event, &presenter);
        }

        if let Some(exporter) = exporter {
            if now.duration_since(last_publish) >= METRICS_PUBLISH_INTERVAL {
                exporter.publish(receiver);
                last_publish = now;
            }
        }

        std::thread::sleep(PUMP_INTERVAL);
    }

    receiver.stop_stream();
    for event in events.try_iter() {
        log_event(&event, &presenter);
    }

    let stats = receiver.stats();
    info!(
        frames = stats.frames_received,
        discarded = stats.frames_discarded,
        stale = stats.stale_handoffs,
        bus_errors = stats.bus_errors,
        bus_warnings = stats.bus_warnings,
        "Receiver shut down"
    );
}

fn log_event(event: &ReceiverEvent, presenter: &FramePresenter) {
    match event {
        ReceiverEvent::FrameReady(id) => {
            let frame = presenter.fetch_frame(id);
            trace!(frame = %id, width = frame.width, height = frame.height, "Frame ready");
        }
        ReceiverEvent::StatusChanged(status) => info!(%status, "Status"),
        ReceiverEvent::StreamingChanged(streaming) => info!(streaming, "Streaming changed"),
        ReceiverEvent::ActiveStreamChanged(true) => info!("Video signal acquired"),
        ReceiverEvent::ActiveStreamChanged(false) => warn!("Video signal lost"),
        ReceiverEvent::FpsChanged(fps) => debug!(fps, "FPS"),
        ReceiverEvent::Error(message) => warn!(%message, "Receiver error"),
    }
}

#[cfg(feature = "metrics")]
struct Exporter {
    state: Arc<tokio::sync::RwLock<rtp_video_receiver::metrics::MetricsState>>,
}

#[cfg(feature = "metrics")]
impl Exporter {
    fn spawn(port: u16) -> Option<Self> {
        use rtp_video_receiver::metrics::{MetricsRegistry, MetricsServer, MetricsServerConfig};

        if port == 0 {
            return None;
        }

        let registry = match MetricsRegistry::new() {
            Ok(registry) => registry,
            Err(e) => {
                warn!(error = %e, "Failed to create metrics registry");
                return None;
            }
        };
        let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
        let state = server.state();

        std::thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!(error = %e, "Failed to start metrics runtime");
                    return;
                }
            };
            if let Err(e) = runtime.block_on(server.run()) {
                warn!(error = %e, "Metrics server stopped");
            }
        });

        Some(Self { state })
    }

    fn publish<B: MediaBackend>(&self, receiver: &StreamPipelineManager<B>) {
        let snapshot = rtp_video_receiver::metrics::MetricsSnapshot::from_receiver(receiver);
        self.state.blocking_write().update(snapshot);
    }
}

#[cfg(not(feature = "metrics"))]
#[allow(dead_code)]
struct Exporter;

#[cfg(not(feature = "metrics"))]
impl Exporter {
    fn spawn(port: u16) -> Option<Self> {
        if port != 0 {
            debug!(port, "Built without the metrics feature, exporter disabled");
        }
        None
    }

    fn publish<B: MediaBackend>(&self, _receiver: &StreamPipelineManager<B>) {}
}

#[cfg(not(feature = "gstreamer"))]
mod demo {
    use super::{run, Exporter};
    use rtp_video_receiver::{
        backend::{MockBackend, MockSample},
        config::ReceiverConfig,
        receiver::StreamPipelineManager,
    };
    use std::sync::atomic::AtomicBool;
    use std::time::{Duration, Instant};
    use tracing::info;

    const WIDTH: u32 = 320;
    const HEIGHT: u32 = 240;
    const FRAME_INTERVAL: Duration = Duration::from_millis(33);
    const SEND_FOR: Duration = Duration::from_secs(5);
    const DEFAULT_RUN_SECS: u64 = 10;

    /// Runs the receiver against a mock pipeline.
    ///
    /// The producer sends a moving gradient for a few seconds and then goes
    /// silent while the pipeline stays up, so the run shows the stream going
    /// active and then timing out.
    pub(super) fn run_mock(
        config: ReceiverConfig,
        duration: Option<u64>,
        running: &AtomicBool,
        exporter: Option<&Exporter>,
    ) {
        info!("This is a demonstration using a mock pipeline");

        let backend = MockBackend::new();
        let mut receiver = StreamPipelineManager::new(backend.clone(), config);
        let deadline = Instant::now() + Duration::from_secs(duration.unwrap_or(DEFAULT_RUN_SECS));

        // Starts the producer as soon as the first pipeline shows up
        let producer = std::thread::spawn(move || {
            let started = Instant::now();
            let handle = loop {
                if let Some(handle) = backend.pipeline() {
                    break handle;
                }
                if started.elapsed() > SEND_FOR {
                    return 0u64;
                }
                std::thread::sleep(Duration::from_millis(5));
            };

            let mut sent = 0u64;
            while started.elapsed() < SEND_FOR {
                if !handle.push_sample(MockSample::rgb(WIDTH, HEIGHT, gradient(sent))) {
                    break;
                }
                sent += 1;
                std::thread::sleep(FRAME_INTERVAL);
            }
            info!(sent, "Synthetic producer went silent");
            sent
        });

        run(&mut receiver, Some(deadline), running, exporter);

        if let Ok(sent) = producer.join() {
            info!(sent, received = receiver.stats().frames_received, "Demo finished");
        }
    }

    fn gradient(tick: u64) -> Vec<u8> {
        let shift = (tick % 256) as usize;
        let mut data = Vec::with_capacity((WIDTH * HEIGHT * 3) as usize);
        for y in 0..HEIGHT as usize {
            for x in 0..WIDTH as usize {
                data.push(((x + shift) % 256) as u8);
                data.push(((y + shift) % 256) as u8);
                data.push((shift ^ (x / 8)) as u8);
            }
        }
        data
    }
}
