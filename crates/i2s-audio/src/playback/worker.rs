use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{with_timeout, Duration, Timer};

use super::events::{LifecycleEvent, PlaybackQueues};
use crate::config::PlaybackConfig;
use crate::port::{I2sPort, SharedPort};
use crate::{AudioError, CHUNK_CAPACITY, SAMPLE_BYTES};

const PLAY_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Hands a [`StreamWorker`] to a background execution context.
///
/// On embassy this spawns a task, e.g.
///
/// ```ignore
/// type Worker = StreamWorker<'static, CriticalSectionRawMutex, Port>;
///
/// #[embassy_executor::task]
/// async fn speaker_task(worker: Worker) {
///     worker.run().await
/// }
///
/// impl WorkerLauncher<'static, CriticalSectionRawMutex, Port> for Spawner {
///     fn launch(&mut self, worker: Worker) -> Result<(), AudioError> {
///         self.spawn(speaker_task(worker))
///             .map_err(|_| AudioError::LaunchFailed)
///     }
/// }
/// ```
pub trait WorkerLauncher<'a, M: RawMutex, P: I2sPort> {
    fn launch(
        &mut self,
        worker: StreamWorker<'a, M, P>,
    ) -> Result<(), AudioError>;
}

/// Background half of the playback device.
///
/// Drains the data queue into the speaker and reports back over the event
/// queue. Exits after an end-of-stream chunk, or once the queue has been
/// empty for the configured drain timeout.
pub struct StreamWorker<'a, M: RawMutex, P: I2sPort> {
    port: &'a SharedPort<M, P>,
    queues: &'a PlaybackQueues<M>,
    config: PlaybackConfig,
}

impl<'a, M: RawMutex, P: I2sPort> StreamWorker<'a, M, P> {
    pub fn new(
        port: &'a SharedPort<M, P>,
        queues: &'a PlaybackQueues<M>,
        config: PlaybackConfig,
    ) -> Self {
        Self { port, queues, config }
    }

    pub async fn run(self) {
        self.emit(LifecycleEvent::Starting).await;

        if let Err(e) = self.start_hardware().await {
            error!("Failed to start speaker");
            self.emit(e.into()).await;
            self.emit(LifecycleEvent::Stopped).await;
            return;
        }

        info!("Speaker started");
        self.emit(LifecycleEvent::Started).await;

        let mut samples = [0i16; CHUNK_CAPACITY / SAMPLE_BYTES];

        loop {
            let chunk = match with_timeout(
                self.config.drain_timeout(),
                self.queues.data().receive(),
            )
            .await
            {
                Ok(chunk) => chunk,
                Err(_) => {
                    debug!("Data queue idle, ending stream");
                    break;
                }
            };

            if chunk.is_end_of_stream() {
                // Anything queued behind the marker belongs to no stream.
                self.queues.data().clear();
                break;
            }

            let count = chunk.len() / SAMPLE_BYTES;
            if count == 0 {
                warn!("Invalid data chunk length: {}", chunk.len());
                self.notify(AudioError::InvalidChunk(chunk.len()).into());
                continue;
            }

            for (sample, bytes) in samples
                .iter_mut()
                .zip(chunk.as_bytes().chunks_exact(SAMPLE_BYTES))
            {
                *sample = i16::from_le_bytes([bytes[0], bytes[1]]);
            }

            if let Err(e) = self.play(&samples[..count]).await {
                warn!("Dropped rest of chunk: {:?}", e);
                self.notify(e.into());
            }

            self.notify(LifecycleEvent::Progress);
        }

        self.port.lock().await.end_playback();
        info!("Speaker ended");

        self.emit(LifecycleEvent::Stopping).await;
        self.emit(LifecycleEvent::Stopped).await;
    }

    async fn start_hardware(&self) -> Result<(), AudioError> {
        self.port.lock().await.end_capture();
        Timer::after(self.config.settle()).await;

        let mut port = self.port.lock().await;
        port.configure_playback(&self.config);
        port.begin_playback().map_err(|_| AudioError::StartFailed)
    }

    /// Send `samples` one unit at a time. A failed or late unit abandons the
    /// remainder.
    async fn play(&self, samples: &[i16]) -> Result<(), AudioError> {
        for unit in samples.chunks(self.config.unit_samples) {
            self.port
                .lock()
                .await
                .play_raw(unit, self.config.sample_rate)
                .map_err(|_| AudioError::PlaybackFailed)?;

            with_timeout(self.config.unit_timeout(), self.wait_for_unit())
                .await
                .map_err(|_| AudioError::PlaybackTimeout)?;
        }
        Ok(())
    }

    async fn wait_for_unit(&self) {
        loop {
            if !self.port.lock().await.is_playing() {
                return;
            }
            Timer::after(PLAY_POLL_INTERVAL).await;
        }
    }

    /// Deliver a lifecycle event, waiting for room if the poller is behind.
    async fn emit(&self, event: LifecycleEvent) {
        self.queues.events().send(event).await;
    }

    /// Best-effort delivery; dropped when the event queue is full.
    fn notify(&self, event: LifecycleEvent) {
        if self.queues.events().try_send(event).is_err() {
            trace!("Event queue full, dropped {:?}", event);
        }
    }
}
