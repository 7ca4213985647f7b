use embassy_sync::blocking_mutex::raw::RawMutex;
use i2s_lock::PortLock;

use crate::capture::CaptureDevice;
use crate::config::{CaptureConfig, PlaybackConfig};
use crate::playback::{PlaybackDevice, PlaybackQueues, WorkerLauncher};
use crate::port::{I2sPort, SharedPort};

/// Parent component owning both devices on one port.
///
/// The host calls [`setup`](Self::setup) once and [`poll`](Self::poll) from
/// its main loop; both devices are driven from that single context.
pub struct AudioHub<'a, M, P, L>
where
    M: RawMutex,
    P: I2sPort,
    L: WorkerLauncher<'a, M, P>,
{
    lock: &'a PortLock,
    port: &'a SharedPort<M, P>,
    capture: CaptureDevice<'a, M, P>,
    playback: PlaybackDevice<'a, M, P, L>,
}

impl<'a, M, P, L> AudioHub<'a, M, P, L>
where
    M: RawMutex,
    P: I2sPort,
    L: WorkerLauncher<'a, M, P>,
{
    pub fn new(
        lock: &'a PortLock,
        port: &'a SharedPort<M, P>,
        queues: &'a PlaybackQueues<M>,
        launcher: L,
        capture: CaptureConfig,
        playback: PlaybackConfig,
    ) -> Self {
        Self {
            lock,
            port,
            capture: CaptureDevice::new(lock, port, capture)
                .with_idle_playback(playback.clone()),
            playback: PlaybackDevice::new(
                lock, port, queues, launcher, playback,
            ),
        }
    }

    pub async fn setup(&mut self) {
        info!("Audio setup");
        self.capture.setup();
        self.playback.setup().await;
        info!("Audio initialized");
    }

    /// One step of both state machines.
    pub async fn poll(&mut self) {
        self.capture.poll().await;
        self.playback.poll().await;
    }

    /// Request both devices to stop and silence the port immediately.
    ///
    /// For system shutdown; the port lock is left as is because nothing
    /// will poll afterwards.
    pub async fn shutdown(&mut self) {
        info!("Audio shutdown");
        self.capture.stop();
        self.playback.stop();

        let mut port = self.port.lock().await;
        port.end_playback();
        port.end_capture();
    }

    pub fn wants_fast_poll(&self) -> bool {
        self.capture.wants_fast_poll()
    }

    pub fn capture(&mut self) -> &mut CaptureDevice<'a, M, P> {
        &mut self.capture
    }

    pub fn playback(&mut self) -> &mut PlaybackDevice<'a, M, P, L> {
        &mut self.playback
    }

    pub fn dump_config(&self) {
        let capture = self.capture.config();
        let playback = self.playback.config();
        info!("Shared I2S audio:");
        info!("  Port holder: {:?}", self.lock.holder());
        info!(
            "  Capture: {} Hz, {} ch, {} bit, state {:?}",
            capture.sample_rate,
            capture.channels,
            capture.bits_per_sample,
            self.capture.state(),
        );
        info!(
            "  Playback: {} Hz, volume {}, state {:?}",
            playback.sample_rate,
            playback.volume,
            self.playback.state(),
        );
    }
}
