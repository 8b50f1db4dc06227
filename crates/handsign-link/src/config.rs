//! Link configuration.

use std::path::PathBuf;
use std::time::Duration;

use handsign_core::{FRAME_HEIGHT, FRAME_WIDTH};
use serde::{Deserialize, Serialize};

use crate::transport::DEFAULT_MAX_TRANSFER;

/// Default spidev node (bus 0, chip select 0).
const DEFAULT_DEVICE: &str = "/dev/spidev0.0";
/// Default upper bound on single-byte polls per phase.
const DEFAULT_MAX_POLLS: u32 = 2_000_000;
/// Default wall-clock bound on a whole pipeline run.
const DEFAULT_DEADLINE_MS: u64 = 10_000;

/// Bounds on completion polling during `run_pipeline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Maximum polls per phase (start, then finish).
    pub max_polls: u32,
    /// Pause between polls, in microseconds. Zero polls back to back.
    pub interval_us: u64,
    /// Wall-clock limit for the whole run, in milliseconds.
    pub deadline_ms: Option<u64>,
}

impl PollPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_micros(self.interval_us)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_polls: std::env::var("HANDSIGN_POLL_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_POLLS),
            interval_us: 0,
            deadline_ms: Some(DEFAULT_DEADLINE_MS),
        }
    }
}

/// Runtime configuration for an accelerator link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// spidev device node.
    pub device: PathBuf,
    /// Largest single bus transfer, in bytes.
    pub max_transfer: usize,
    /// Plane geometry the accelerator works on; bounds outgoing planes and
    /// sizes incoming ones.
    pub frame_width: u32,
    pub frame_height: u32,
    pub poll: PollPolicy,
}

impl LinkConfig {
    /// Largest plane payload the accelerator accepts.
    pub fn frame_budget(&self) -> usize {
        (self.frame_width as usize) * (self.frame_height as usize)
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device: std::env::var("HANDSIGN_SPI_DEVICE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DEVICE)),
            max_transfer: std::env::var("HANDSIGN_SPI_MAX_TRANSFER")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(DEFAULT_MAX_TRANSFER),
            frame_width: FRAME_WIDTH,
            frame_height: FRAME_HEIGHT,
            poll: PollPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_budget_matches_capture_frame() {
        let config = LinkConfig {
            frame_width: 320,
            frame_height: 240,
            ..LinkConfig::default()
        };
        assert_eq!(config.frame_budget(), 76_800);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: LinkConfig = serde_json::from_str(r#"{ "poll": { "max_polls": 7 } }"#).unwrap();
        assert_eq!(config.poll.max_polls, 7);
        assert_eq!(config.frame_width, FRAME_WIDTH);
        assert_eq!(config.poll.interval(), Duration::ZERO);
    }
}
