use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::with_timeout;
use i2s_lock::{Holder, PortLock};

use super::events::{DataChunk, LifecycleEvent, PlaybackQueues};
use super::worker::{StreamWorker, WorkerLauncher};
use crate::config::PlaybackConfig;
use crate::port::{I2sPort, SharedPort};
use crate::state::{DeviceState, DeviceStatus};
use crate::CHUNK_CAPACITY;

/// Speaker side of the shared port.
///
/// The device is marked running as soon as it owns the port and the worker
/// is launched; the worker's own `Started` event is informational.
///
/// Every byte `write` accepts is played before the device reports
/// `Stopped`, unless the speaker path itself cannot be brought up.
pub struct PlaybackDevice<'a, M, P, L>
where
    M: RawMutex,
    P: I2sPort,
    L: WorkerLauncher<'a, M, P>,
{
    lock: &'a PortLock,
    port: &'a SharedPort<M, P>,
    queues: &'a PlaybackQueues<M>,
    launcher: L,
    config: PlaybackConfig,
    state: DeviceState,
    status: DeviceStatus,
    /// A launched worker has not yet reported `Stopped`.
    worker_active: bool,
    /// Set between the worker's `Started` and `Stopped` events.
    streaming: bool,
}

impl<'a, M, P, L> PlaybackDevice<'a, M, P, L>
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
        config: PlaybackConfig,
    ) -> Self {
        Self {
            lock,
            port,
            queues,
            launcher,
            config,
            state: DeviceState::Stopped,
            status: DeviceStatus::default(),
            worker_active: false,
            streaming: false,
        }
    }

    /// Validate the configuration and leave the speaker in its idle setup.
    pub async fn setup(&mut self) {
        info!("Speaker setup");
        if let Err(e) = self.config.validate() {
            error!("Invalid playback config: {:?}", e);
            self.status.mark_failed();
            return;
        }

        let mut port = self.port.lock().await;
        port.configure_playback(&self.config);
        if port.begin_playback().is_err() {
            warn!("Failed to begin idle speaker configuration");
        }
        port.set_volume(self.config.volume);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Warning and failure flags for the host.
    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    /// Settings handed to every worker.
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Request playback; the worker is launched on a later poll step once
    /// the port is free. Only has an effect while stopped.
    pub fn start(&mut self) {
        if self.status.is_failed() || self.state != DeviceState::Stopped {
            return;
        }
        self.state = DeviceState::Starting;
    }

    /// Ask the worker to finish after everything already queued.
    ///
    /// If no worker is running yet, one is still launched to drain what
    /// `write` accepted; with nothing queued the device stops at once.
    pub fn stop(&mut self) {
        if self.status.is_failed() {
            return;
        }
        match self.state {
            DeviceState::Stopped | DeviceState::Stopping => {}
            DeviceState::Starting if !self.has_buffered_data() => {
                self.state = DeviceState::Stopped;
            }
            DeviceState::Starting | DeviceState::Running => {
                self.state = DeviceState::Stopping;
                if self
                    .queues
                    .data()
                    .try_send(DataChunk::end_of_stream())
                    .is_err()
                {
                    warn!("Data queue full, worker will stop once drained");
                }
            }
        }
    }

    /// Resolve a pending start, or consume one event from the worker.
    pub async fn poll(&mut self) {
        if self.status.is_failed() {
            return;
        }
        match self.state {
            DeviceState::Stopped => {}
            DeviceState::Starting => self.start_worker(),
            // Stop was requested before any worker picked up the data.
            DeviceState::Stopping if !self.worker_active => {
                self.start_worker()
            }
            DeviceState::Running | DeviceState::Stopping => self.watch(),
        }
    }

    /// Queue `data` for playback and return how many bytes were accepted.
    ///
    /// A short count means the queue stayed full for the enqueue timeout;
    /// retry with the remainder later. Nothing is accepted while a stop is
    /// in progress.
    pub async fn write(&mut self, data: &[u8]) -> usize {
        if data.is_empty() || self.status.is_failed() {
            return 0;
        }
        match self.state {
            DeviceState::Stopping => return 0,
            DeviceState::Stopped => self.start(),
            DeviceState::Starting | DeviceState::Running => {}
        }

        let mut accepted = 0;
        for piece in data.chunks(CHUNK_CAPACITY) {
            let Some(chunk) = DataChunk::from_slice(piece) else {
                break;
            };
            let sent = with_timeout(
                self.config.enqueue_timeout(),
                self.queues.data().send(chunk),
            )
            .await;
            if sent.is_err() {
                debug!("Data queue full, accepted {} bytes", accepted);
                break;
            }
            accepted += piece.len();
        }
        accepted
    }

    /// `true` while chunks are waiting in the data queue.
    ///
    /// The worker may still be playing the chunk it last dequeued.
    pub fn has_buffered_data(&self) -> bool {
        !self.queues.data().is_empty()
    }

    /// Take the port and hand a fresh worker to the launcher. A pending
    /// stop stays pending; its end marker is already queued.
    fn start_worker(&mut self) {
        if !self.lock.try_acquire(Holder::Playback) {
            // Microphone still owns the port; retry on the next poll.
            return;
        }

        let worker =
            StreamWorker::new(self.port, self.queues, self.config.clone());
        if let Err(e) = self.launcher.launch(worker) {
            error!("Failed to launch speaker worker: {:?}", e);
            self.lock.release(Holder::Playback);
            self.status.set_warning(e);
            self.discard_queued();
            self.state = DeviceState::Stopped;
            return;
        }

        self.worker_active = true;
        if self.state == DeviceState::Starting {
            self.state = DeviceState::Running;
        }
    }

    /// Consume at most one worker event.
    fn watch(&mut self) {
        let Ok(event) = self.queues.events().try_receive() else {
            return;
        };

        match event {
            LifecycleEvent::Starting => debug!("Starting"),
            LifecycleEvent::Started => {
                debug!("Started");
                self.streaming = true;
                self.status.clear_warning();
            }
            LifecycleEvent::Progress => trace!("Playing"),
            LifecycleEvent::Stopping => debug!("Stopping"),
            LifecycleEvent::Stopped => {
                debug!("Stopped");
                self.lock.release(Holder::Playback);
                self.worker_active = false;
                self.finish_session();
            }
            LifecycleEvent::Warning(e) => {
                warn!("Speaker worker warning: {:?}", e);
                self.status.set_warning(e);
            }
        }
    }

    /// Decide what follows a worker exit.
    fn finish_session(&mut self) {
        if !core::mem::take(&mut self.streaming) {
            // The speaker never came up; queued data cannot be played.
            self.discard_queued();
            self.state = DeviceState::Stopped;
            return;
        }

        match self.state {
            // Data arrived after the worker gave up on an idle queue.
            DeviceState::Running if self.has_buffered_data() => {
                self.state = DeviceState::Starting;
            }
            // Stop raced an idle exit; the next poll launches a worker to
            // drain what is left.
            DeviceState::Stopping if !self.nothing_left_to_play() => {}
            _ => self.state = DeviceState::Stopped,
        }
    }

    /// `true` when the data queue is empty or holds only an end marker no
    /// worker reached, which is removed. Called with no worker running and
    /// writes refused, so nothing else touches the queue meanwhile.
    fn nothing_left_to_play(&self) -> bool {
        let data = self.queues.data();
        if data.len() != 1 {
            return data.is_empty();
        }
        match data.try_receive() {
            Ok(chunk) if chunk.is_end_of_stream() => true,
            Ok(chunk) => {
                // A lone chunk whose marker was dropped on a full queue.
                let _ = data.try_send(chunk);
                let _ = data.try_send(DataChunk::end_of_stream());
                false
            }
            Err(_) => true,
        }
    }

    fn discard_queued(&self) {
        let dropped = self.queues.data().len();
        if dropped > 0 {
            warn!("Discarding {} queued chunks", dropped);
            self.queues.data().clear();
        }
    }
}
