//! Receiver configuration.
//!
//! Everything tunable about the receive path lives here: the pipeline's
//! buffer depths, the control-path timer intervals, the liveness timeout
//! and the placeholder shown before the first frame. Loaded from TOML; every
//! section falls back to its defaults when omitted.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Pipeline parameters substituted into the stage graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// UDP port to listen on when none is given explicitly.
    pub port: u16,
    /// Kernel receive buffer requested by the network source, in bytes.
    pub udp_buffer_size: u32,
    /// Depth of the leaky queue ahead of the decoder, in buffers.
    pub queue_max_buffers: u32,
    /// Internal buffering of the application sink, in buffers.
    pub sink_max_buffers: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            udp_buffer_size: 200_000,
            queue_max_buffers: 100,
            sink_max_buffers: 100,
        }
    }
}

/// Control-path timer settings, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Interval between message bus drains.
    pub bus_poll_interval_ms: u64,
    /// Interval between liveness checks.
    pub timeout_check_interval_ms: u64,
    /// Silence after which the stream is considered lost.
    pub frame_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            bus_poll_interval_ms: 50,
            timeout_check_interval_ms: 1000,
            frame_timeout_ms: 3000,
        }
    }
}

impl TimingConfig {
    /// Bus poll interval as a `Duration`.
    pub fn bus_poll_interval(&self) -> Duration {
        Duration::from_millis(self.bus_poll_interval_ms)
    }

    /// Liveness check interval as a `Duration`.
    pub fn timeout_check_interval(&self) -> Duration {
        Duration::from_millis(self.timeout_check_interval_ms)
    }

    /// Frame timeout as a `Duration`.
    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms)
    }
}

/// Size of the image served before any frame arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderConfig {
    /// Placeholder width in pixels.
    pub width: u32,
    /// Placeholder height in pixels.
    pub height: u32,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

/// Metrics exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Metrics server port (0 to disable).
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { port: 9090 }
    }
}

/// Full receiver configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReceiverConfig {
    /// Pipeline parameters.
    #[serde(default)]
    pub stream: StreamConfig,
    /// Control-path timers.
    #[serde(default)]
    pub timing: TimingConfig,
    /// Image shown before the first frame.
    #[serde(default)]
    pub placeholder: PlaceholderConfig,
    /// Metrics exporter.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// The stream port is zero.
    #[error("port must be non-zero")]
    InvalidPort,
    /// A buffer depth or size is zero.
    #[error("{0} must be non-zero")]
    InvalidBufferSize(&'static str),
    /// A timer interval or timeout is zero.
    #[error("{0} must be non-zero")]
    InvalidInterval(&'static str),
    /// The placeholder has a zero dimension.
    #[error("invalid placeholder dimensions")]
    InvalidPlaceholder,
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

impl ReceiverConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ReceiverConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.stream.udp_buffer_size == 0 {
            return Err(ConfigError::InvalidBufferSize("udp_buffer_size"));
        }
        if self.stream.queue_max_buffers == 0 {
            return Err(ConfigError::InvalidBufferSize("queue_max_buffers"));
        }
        if self.stream.sink_max_buffers == 0 {
            return Err(ConfigError::InvalidBufferSize("sink_max_buffers"));
        }
        if self.timing.bus_poll_interval_ms == 0 {
            return Err(ConfigError::InvalidInterval("bus_poll_interval_ms"));
        }
        if self.timing.timeout_check_interval_ms == 0 {
            return Err(ConfigError::InvalidInterval("timeout_check_interval_ms"));
        }
        if self.timing.frame_timeout_ms == 0 {
            return Err(ConfigError::InvalidInterval("frame_timeout_ms"));
        }
        if self.placeholder.width == 0 || self.placeholder.height == 0 {
            return Err(ConfigError::InvalidPlaceholder);
        }
        Ok(())
    }
}
