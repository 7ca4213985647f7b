//! Microphone side of the shared port.
//!
//! Start and stop only record a request; the hardware transition happens on
//! the next [`CaptureDevice::poll`] so it never runs on the caller's stack.
//! Reads are synchronous, one bounded record transaction per call.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{with_timeout, Duration, Timer};
use i2s_lock::{Holder, PortLock};

use crate::config::{CaptureConfig, PlaybackConfig};
use crate::port::{I2sPort, SharedPort};
use crate::state::{DeviceState, DeviceStatus};
use crate::{AudioError, MAX_READ_SAMPLES, SAMPLE_BYTES};

const RECORD_POLL_INTERVAL: Duration = Duration::from_millis(1);

pub struct CaptureDevice<'a, M: RawMutex, P: I2sPort> {
    lock: &'a PortLock,
    port: &'a SharedPort<M, P>,
    config: CaptureConfig,
    /// Speaker configuration restored when the microphone hands the port back.
    idle_playback: PlaybackConfig,
    state: DeviceState,
    status: DeviceStatus,
}

impl<'a, M: RawMutex, P: I2sPort> CaptureDevice<'a, M, P> {
    pub fn new(
        lock: &'a PortLock,
        port: &'a SharedPort<M, P>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            lock,
            port,
            config,
            idle_playback: PlaybackConfig::default(),
            state: DeviceState::Stopped,
            status: DeviceStatus::default(),
        }
    }

    /// Use `config` when restoring the speaker after a capture session.
    pub fn with_idle_playback(mut self, config: PlaybackConfig) -> Self {
        self.idle_playback = config;
        self
    }

    /// Validate the configuration; an invalid one marks the device failed.
    pub fn setup(&mut self) {
        info!("Capture setup");
        if let Err(e) = self.config.validate() {
            error!("Invalid capture config: {:?}", e);
            self.status.mark_failed();
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Warning and failure flags for the host.
    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    /// Settings applied on every start.
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// The host should poll at its highest rate while this is `true`.
    pub fn wants_fast_poll(&self) -> bool {
        self.state == DeviceState::Running
    }

    /// Request the microphone; the port is taken on a later poll step.
    pub fn start(&mut self) {
        match self.state {
            _ if self.status.is_failed() => {}
            DeviceState::Running | DeviceState::Starting => {}
            // Teardown has not run yet; the microphone still owns the port.
            DeviceState::Stopping => self.state = DeviceState::Running,
            DeviceState::Stopped => self.state = DeviceState::Starting,
        }
    }

    /// Request teardown; the port is handed back on the next poll step.
    pub fn stop(&mut self) {
        if self.status.is_failed() || self.state == DeviceState::Stopped {
            return;
        }
        if self.state == DeviceState::Starting {
            // The port was never taken, so there is nothing to hand back.
            self.state = DeviceState::Stopped;
            return;
        }
        self.state = DeviceState::Stopping;
    }

    /// Resolve a pending start or stop.
    pub async fn poll(&mut self) {
        if self.status.is_failed() {
            return;
        }
        match self.state {
            DeviceState::Starting => self.start_hardware().await,
            DeviceState::Stopping => self.stop_hardware().await,
            DeviceState::Running | DeviceState::Stopped => {}
        }
    }

    async fn start_hardware(&mut self) {
        if !self.lock.try_acquire(Holder::Capture) {
            // Speaker still owns the port; retry on the next poll.
            return;
        }

        self.port.lock().await.end_playback();
        Timer::after(self.config.settle()).await;

        let begun = {
            let mut port = self.port.lock().await;
            port.configure_capture(&self.config);
            port.begin_capture()
        };

        if begun.is_err() {
            error!("Failed to start microphone");
            self.lock.release(Holder::Capture);
            self.state = DeviceState::Stopped;
            self.status.set_warning(AudioError::StartFailed);
            return;
        }

        info!("Microphone started");
        self.status.clear_warning();
        self.state = DeviceState::Running;
    }

    async fn stop_hardware(&mut self) {
        self.port.lock().await.end_capture();
        info!("Microphone ended");

        Timer::after(self.config.settle()).await;

        {
            let mut port = self.port.lock().await;
            port.configure_playback(&self.idle_playback);
            if port.begin_playback().is_err() {
                warn!("Failed to restore idle speaker configuration");
            }
            port.set_volume(self.idle_playback.volume);
        }

        self.lock.release(Holder::Capture);
        self.state = DeviceState::Stopped;
    }

    /// Record into `buf`, waiting at most `timeout` for the transaction.
    ///
    /// Samples are 16-bit little-endian, interleaved when the config asks
    /// for two channels. The length is truncated to whole samples and capped
    /// at [`MAX_READ_SAMPLES`]. Returns the number of bytes written, which is
    /// 0 on invalid input, timeout or driver failure.
    pub async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> usize {
        if self.status.is_failed() || self.state != DeviceState::Running {
            return 0;
        }

        let samples = (buf.len() / SAMPLE_BYTES).min(MAX_READ_SAMPLES);
        if samples == 0 {
            warn!("Buffer too small for samples: {} bytes", buf.len());
            return 0;
        }
        let len = samples * SAMPLE_BYTES;

        let mut scratch = [0i16; MAX_READ_SAMPLES];
        let scratch = &mut scratch[..samples];

        let started = self
            .port
            .lock()
            .await
            .record(samples, self.config.sample_rate);
        if started.is_err() {
            warn!("Failed to start recording");
            self.status.set_warning(AudioError::RecordFailed);
            return 0;
        }

        if with_timeout(timeout, self.wait_for_record()).await.is_err() {
            warn!("Recording timeout");
            self.status.set_warning(AudioError::RecordTimeout);
            return 0;
        }

        let copied = self.port.lock().await.take_recorded(scratch);
        if copied != samples {
            warn!("Short recording: {} of {} samples", copied, samples);
            self.status.set_warning(AudioError::RecordFailed);
            return 0;
        }

        for (dst, sample) in
            buf[..len].chunks_exact_mut(SAMPLE_BYTES).zip(scratch.iter())
        {
            dst.copy_from_slice(&sample.to_le_bytes());
        }

        self.status.clear_warning();
        len
    }

    async fn wait_for_record(&self) {
        loop {
            if !self.port.lock().await.is_recording() {
                return;
            }
            Timer::after(RECORD_POLL_INTERVAL).await;
        }
    }
}
