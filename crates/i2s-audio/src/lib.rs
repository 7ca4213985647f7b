#![cfg_attr(not(test), no_std)]
//! Time-multiplexed access to a half-duplex I2S transceiver shared by a
//! microphone and a speaker.
//!
//! Each side is a polled state machine that must win the [`PortLock`]
//! before touching the port. Capture reads are synchronous and bounded by a
//! timeout; playback is fed through a bounded queue to a background
//! [`StreamWorker`] which reports back over a second queue.

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

mod capture;
mod config;
mod error;
mod hub;
pub mod playback;
mod port;
mod state;

pub use capture::CaptureDevice;
pub use config::{CaptureConfig, PlaybackConfig};
pub use error::AudioError;
pub use hub::AudioHub;
pub use i2s_lock::{Holder, PortLock};
pub use playback::{
    DataChunk, LifecycleEvent, PlaybackDevice, PlaybackQueues, StreamWorker,
    WorkerLauncher,
};
pub use port::{I2sPort, SharedPort};
pub use state::{DeviceState, DeviceStatus};

/// Bytes per PCM sample.
pub const SAMPLE_BYTES: usize = core::mem::size_of::<i16>();
/// Payload bytes per data queue slot.
pub const CHUNK_CAPACITY: usize = 512;
/// Slots in each of the playback queues.
pub const QUEUE_DEPTH: usize = 20;
/// Largest single capture read, in samples.
pub const MAX_READ_SAMPLES: usize = 1024;
