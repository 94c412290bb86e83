use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{FrameRate, OutputPixelFormat};

pub const DEFAULT_SCHEME: &str = "ndimediain";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Name the sender announces on the network.
    pub source_name: String,
    pub output_pixel_format: OutputPixelFormat,
    pub frame_rate: FrameRate,
    pub queue: QueueConfig,
    /// Empty frames pushed before the send worker starts.
    pub placeholder_frames: usize,
    pub idle_sleep_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum queued frames, unbounded when `None`. Written as `0` in files.
    #[serde(with = "capacity_or_zero")]
    pub capacity: Option<usize>,
    pub overflow: OverflowPolicy,
    /// Longest a producer waits for space under `OverflowPolicy::Block`.
    pub block_timeout_ms: u64,
}

/// `capacity = 0` stands for an unbounded queue.
mod capacity_or_zero {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(capacity: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(capacity.unwrap_or(0) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
        let capacity = usize::deserialize(deserializer)?;
        Ok((capacity > 0).then_some(capacity))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    DropOldest,
    DropNewest,
    Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// URL scheme that selects network receive mode.
    pub scheme: String,
    pub source_match: SourceMatch,
    pub poll_timeout_ms: u64,
    /// Pending video samples kept in the sink before a new one is added.
    pub max_pending_video: usize,
    pub receiver_queue_depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMatch {
    /// Compare against the `SOURCE` part of `MACHINE (SOURCE)`.
    SourceName,
    /// Compare against the whole advertised name.
    FullName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub kind: TransportKind,
    /// Host label for loopback sources.
    pub host_name: String,
    pub bind_address: String,
    /// Where UDP senders push frames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub max_packet_size: usize,
    pub socket_buffer_bytes: usize,
    pub sources: Vec<SourceEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Loopback,
    Udp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub address: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source_name: "framelink".into(),
            output_pixel_format: OutputPixelFormat::Rgb,
            frame_rate: FrameRate::default(),
            queue: QueueConfig::default(),
            placeholder_frames: 4,
            idle_sleep_ms: 1,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: Some(8),
            overflow: OverflowPolicy::DropOldest,
            block_timeout_ms: 20,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.into(),
            source_match: SourceMatch::SourceName,
            poll_timeout_ms: 0,
            max_pending_video: 1,
            receiver_queue_depth: 4,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Loopback,
            host_name: "LOOPBACK".into(),
            bind_address: "0.0.0.0:0".into(),
            target: None,
            max_packet_size: 1400,
            socket_buffer_bytes: 8 * 1024 * 1024,
            sources: Vec::new(),
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.source_name.trim().is_empty() {
            return Err(CoreError::Config("source_name must not be empty".into()));
        }

        if self.frame_rate.numerator == 0 || self.frame_rate.denominator == 0 {
            return Err(CoreError::Config(format!("invalid frame rate {}", self.frame_rate)));
        }

        if self.idle_sleep_ms == 0 {
            return Err(CoreError::Config("idle_sleep_ms must be at least 1".into()));
        }

        if let Some(capacity) = self.queue.capacity {
            if capacity == 0 {
                return Err(CoreError::Config("queue capacity must be at least 1".into()));
            }
            if self.placeholder_frames > capacity {
                return Err(CoreError::Config(format!(
                    "placeholder_frames ({}) exceeds queue capacity ({})",
                    self.placeholder_frames, capacity
                )));
            }
        }

        Ok(())
    }
}

impl PlayerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scheme.is_empty() || self.scheme.contains("://") {
            return Err(CoreError::Config(format!("invalid scheme {:?}", self.scheme)));
        }

        if self.receiver_queue_depth == 0 {
            return Err(CoreError::Config("receiver_queue_depth must be at least 1".into()));
        }

        Ok(())
    }
}

impl TransportConfig {
    pub fn validate(&self) -> Result<()> {
        // Room for the fragment header plus at least one payload byte.
        if self.max_packet_size < 64 || self.max_packet_size > 65_507 {
            return Err(CoreError::Config("max_packet_size must be 64-65507".into()));
        }

        if self.kind == TransportKind::Udp {
            for source in &self.sources {
                if source.address.parse::<std::net::SocketAddr>().is_err() {
                    return Err(CoreError::Config(format!(
                        "source {:?} has invalid address {:?}",
                        source.name, source.address
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        CaptureConfig::default().validate().unwrap();
        PlayerConfig::default().validate().unwrap();
        TransportConfig::default().validate().unwrap();
    }

    #[test]
    fn test_placeholders_must_fit_queue() {
        let mut config = CaptureConfig::default();
        config.queue.capacity = Some(2);
        config.placeholder_frames = 4;
        assert!(config.validate().is_err());

        config.queue.capacity = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CaptureConfig = toml::from_str(
            r#"
            source_name = "Stage Left"
            output_pixel_format = "p210"

            [queue]
            overflow = "block"
            "#,
        )
        .unwrap();

        assert_eq!(config.source_name, "Stage Left");
        assert_eq!(config.output_pixel_format, OutputPixelFormat::P210);
        assert_eq!(config.queue.overflow, OverflowPolicy::Block);
        assert_eq!(config.queue.capacity, Some(8));
        assert_eq!(config.placeholder_frames, 4);
    }

    #[test]
    fn test_udp_sources_need_socket_addresses() {
        let config = TransportConfig {
            kind: TransportKind::Udp,
            sources: vec![SourceEntry {
                name: "HOST (cam)".into(),
                address: "not-an-address".into(),
            }],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unbounded_queue_survives_toml() {
        let mut config = CaptureConfig::default();
        config.queue.capacity = None;

        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("capacity = 0"));

        let loaded: CaptureConfig = toml::from_str(&text).unwrap();
        assert_eq!(loaded.queue.capacity, None);

        config.queue.capacity = Some(3);
        let loaded: CaptureConfig = toml::from_str(&toml::to_string(&config).unwrap()).unwrap();
        assert_eq!(loaded.queue.capacity, Some(3));
    }
}
