use embassy_sync::mutex::Mutex;

use crate::config::{CaptureConfig, PlaybackConfig};

/// Driver for a half-duplex transceiver with a microphone path and a
/// speaker path on the same I2S port.
///
/// The two paths must never run together. Both devices in this crate end the
/// opposite path and wait a settle delay before beginning their own, but the
/// driver itself does not enforce it.
pub trait I2sPort {
    /// Driver error; only ever logged and mapped to an
    /// [`AudioError`](crate::AudioError).
    type Error: core::fmt::Debug;

    fn configure_capture(&mut self, config: &CaptureConfig);
    fn begin_capture(&mut self) -> Result<(), Self::Error>;
    fn end_capture(&mut self);

    /// Start recording `samples` samples into the driver's DMA buffer.
    fn record(
        &mut self,
        samples: usize,
        sample_rate: u32,
    ) -> Result<(), Self::Error>;
    /// `true` while a record transaction is in flight.
    fn is_recording(&self) -> bool;
    /// Copy the last completed recording into `dst`; returns samples copied.
    fn take_recorded(&mut self, dst: &mut [i16]) -> usize;

    fn configure_playback(&mut self, config: &PlaybackConfig);
    fn begin_playback(&mut self) -> Result<(), Self::Error>;
    fn end_playback(&mut self);
    fn set_volume(&mut self, volume: u8);

    /// Queue one unit of samples on the speaker.
    fn play_raw(
        &mut self,
        samples: &[i16],
        sample_rate: u32,
    ) -> Result<(), Self::Error>;
    /// `true` while a queued unit is still playing.
    fn is_playing(&self) -> bool;
}

/// The port as shared between the polling context and the streaming worker.
pub type SharedPort<M, P> = Mutex<M, P>;
