//! Stage graph for the RTP/JPEG receive path.

use crate::config::StreamConfig;
use std::fmt;

/// Name given to the application sink the receiver pulls frames from.
pub const SINK_NAME: &str = "sink";

/// One stage of the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// A processing element with its properties.
    Element {
        /// Factory name of the element.
        factory: &'static str,
        /// Property assignments, in order.
        properties: Vec<(&'static str, String)>,
    },
    /// A capability filter restricting what flows between elements.
    Caps(String),
}

impl Stage {
    fn element(factory: &'static str) -> Self {
        Stage::Element {
            factory,
            properties: Vec::new(),
        }
    }

    fn with(mut self, key: &'static str, value: impl ToString) -> Self {
        if let Stage::Element { properties, .. } = &mut self {
            properties.push((key, value.to_string()));
        }
        self
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Element {
                factory,
                properties,
            } => {
                f.write_str(factory)?;
                for (key, value) in properties {
                    write!(f, " {key}={value}")?;
                }
                Ok(())
            }
            Stage::Caps(caps) => f.write_str(caps),
        }
    }
}

/// Ordered description of the decode graph for one port.
///
/// ```text
/// udpsrc → rtp caps (JPEG) → rtpjpegdepay → leaky queue → jpegdec
///        → videoconvert → raw RGB caps → appsink
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDescription {
    port: u16,
    stages: Vec<Stage>,
}

impl PipelineDescription {
    /// Builds the receive graph bound to `port`.
    pub fn rtp_jpeg(port: u16, config: &StreamConfig) -> Self {
        let stages = vec![
            Stage::element("udpsrc")
                .with("port", port)
                .with("buffer-size", config.udp_buffer_size),
            Stage::Caps("application/x-rtp,encoding-name=JPEG".to_string()),
            Stage::element("rtpjpegdepay"),
            // Drop the oldest buffer when full to keep latency bounded
            Stage::element("queue")
                .with("max-size-buffers", config.queue_max_buffers)
                .with("leaky", "downstream"),
            Stage::element("jpegdec"),
            Stage::element("videoconvert"),
            Stage::Caps("video/x-raw,format=RGB".to_string()),
            Stage::element("appsink")
                .with("name", SINK_NAME)
                .with("sync", false)
                .with("max-buffers", config.sink_max_buffers)
                .with("drop", false),
        ];

        Self { port, stages }
    }

    /// Port the network source is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stages in upstream to downstream order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Renders the graph in `gst-launch` syntax.
    pub fn to_launch_string(&self) -> String {
        self.stages
            .iter()
            .map(Stage::to_string)
            .collect::<Vec<_>>()
            .join(" ! ")
    }
}

impl fmt::Display for PipelineDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_launch_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_string_matches_graph_contract() {
        let description = PipelineDescription::rtp_jpeg(5600, &StreamConfig::default());

        assert_eq!(
            description.to_launch_string(),
            "udpsrc port=5600 buffer-size=200000 ! \
             application/x-rtp,encoding-name=JPEG ! \
             rtpjpegdepay ! \
             queue max-size-buffers=100 leaky=downstream ! \
             jpegdec ! \
             videoconvert ! \
             video/x-raw,format=RGB ! \
             appsink name=sink sync=false max-buffers=100 drop=false"
        );
    }

    #[test]
    fn test_config_values_substituted() {
        let config = StreamConfig {
            port: 1,
            udp_buffer_size: 4096,
            queue_max_buffers: 2,
            sink_max_buffers: 3,
        };
        let description = PipelineDescription::rtp_jpeg(7000, &config);
        let launch = description.to_launch_string();

        assert_eq!(description.port(), 7000);
        assert!(launch.starts_with("udpsrc port=7000 buffer-size=4096"));
        assert!(launch.contains("queue max-size-buffers=2 leaky=downstream"));
        assert!(launch.ends_with("max-buffers=3 drop=false"));
        assert_eq!(description.stages().len(), 8);
    }
}
