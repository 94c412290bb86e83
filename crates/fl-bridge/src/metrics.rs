use std::time::Instant;

use fl_capture::CaptureStats;
use fl_player::PlayerStats;
use serde::Serialize;

#[derive(Debug)]
pub struct MetricsCollector {
    pub capture: Option<CaptureStats>,
    pub player: Option<PlayerStats>,
    pub samples_consumed: u64,
    pub start_time: Instant,
}

/// Point-in-time view printed by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: f64,
    pub send_fps: f64,
    pub receive_fps: f64,
    pub capture: Option<CaptureStats>,
    pub player: Option<PlayerStats>,
    pub samples_consumed: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            capture: None,
            player: None,
            samples_consumed: 0,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let uptime = self.uptime_secs();
        let rate = |count: u64| if uptime > 0.0 { count as f64 / uptime } else { 0.0 };

        MetricsSnapshot {
            uptime_secs: uptime,
            send_fps: rate(self.capture.map_or(0, |c| c.frames_sent)),
            receive_fps: rate(self.player.map_or(0, |p| p.video_samples)),
            capture: self.capture,
            player: self.player,
            samples_consumed: self.samples_consumed,
        }
    }
}

impl MetricsSnapshot {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes_sections() {
        let mut metrics = MetricsCollector::new();
        metrics.player = Some(PlayerStats {
            video_samples: 3,
            ..Default::default()
        });

        let json: serde_json::Value = serde_json::from_str(&metrics.snapshot().to_json()).unwrap();
        assert!(json["capture"].is_null());
        assert_eq!(json["player"]["video_samples"], 3);
    }
}
