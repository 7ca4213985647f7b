use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::{AudioError, CHUNK_CAPACITY, SAMPLE_BYTES};

/// Microphone path settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureConfig {
    pub sample_rate: u32,
    /// 1 (mono) or 2 (stereo).
    pub channels: u8,
    /// Only 16-bit samples are supported by `read`.
    pub bits_per_sample: u8,
    pub dma_buf_count: u8,
    pub dma_buf_len: u16,
    pub task_priority: u8,
    /// Pause between halting the speaker and starting the microphone.
    pub settle_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            bits_per_sample: 16,
            dma_buf_count: 8,
            dma_buf_len: 256,
            task_priority: 15,
            settle_ms: 10,
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), AudioError> {
        if self.sample_rate == 0 {
            return Err(AudioError::InvalidConfig);
        }
        if !matches!(self.channels, 1 | 2) {
            return Err(AudioError::InvalidConfig);
        }
        if usize::from(self.bits_per_sample) != SAMPLE_BYTES * 8 {
            return Err(AudioError::InvalidConfig);
        }
        Ok(())
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Speaker path settings, shared by the idle configuration and the
/// streaming worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlaybackConfig {
    pub sample_rate: u32,
    pub dma_buf_count: u8,
    pub dma_buf_len: u16,
    pub task_priority: u8,
    pub volume: u8,
    /// Pause between halting the microphone and starting the speaker.
    pub settle_ms: u64,
    /// Longest a `write` waits for one free queue slot.
    pub enqueue_timeout_ms: u64,
    /// Idle time after which the worker treats the stream as finished.
    pub drain_timeout_ms: u64,
    /// Samples handed to the driver per transfer.
    pub unit_samples: usize,
    /// Longest the worker waits for one unit to finish playing.
    pub unit_timeout_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            dma_buf_count: 8,
            dma_buf_len: 128,
            task_priority: 15,
            volume: 200,
            settle_ms: 10,
            enqueue_timeout_ms: 10,
            drain_timeout_ms: 100,
            unit_samples: 64,
            unit_timeout_ms: 100,
        }
    }
}

impl PlaybackConfig {
    pub fn validate(&self) -> Result<(), AudioError> {
        if self.sample_rate == 0 {
            return Err(AudioError::InvalidConfig);
        }
        if self.unit_samples == 0
            || self.unit_samples > CHUNK_CAPACITY / SAMPLE_BYTES
        {
            return Err(AudioError::InvalidConfig);
        }
        Ok(())
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    pub fn unit_timeout(&self) -> Duration {
        Duration::from_millis(self.unit_timeout_ms)
    }
}
