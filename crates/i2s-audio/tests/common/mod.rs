#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Timer;
use i2s_audio::{
    AudioError, CaptureConfig, CaptureDevice, DeviceState, I2sPort,
    LifecycleEvent, PlaybackConfig, PlaybackDevice, PlaybackQueues, PortLock,
    SharedPort, StreamWorker, WorkerLauncher,
};

pub type Raw = CriticalSectionRawMutex;
pub type Port = SharedPort<Raw, MockPort>;
pub type Queues = PlaybackQueues<Raw>;
pub type Worker = StreamWorker<'static, Raw, MockPort>;

// ---------------------------------------------------------------------------
// Mock port
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
pub struct MockError;

/// Scripted transceiver that records what was asked of it.
#[derive(Default)]
pub struct MockPort {
    pub capture_active: bool,
    pub playback_active: bool,
    /// Times one path was begun while the other was still active.
    pub overlaps: usize,
    pub capture_begins: usize,
    pub playback_begins: usize,
    /// Fail this many upcoming `begin_capture` calls.
    pub fail_capture_begins: usize,
    /// Fail this many upcoming `begin_playback` calls.
    pub fail_playback_begins: usize,
    pub fail_record: bool,
    /// Record transactions never complete.
    pub stall_record: bool,
    /// Played units never finish.
    pub stall_playback: bool,
    pub record_requests: Vec<usize>,
    pub pending_record: Option<usize>,
    pub played: Vec<i16>,
    pub volume: u8,
}

impl I2sPort for MockPort {
    type Error = MockError;

    fn configure_capture(&mut self, _config: &CaptureConfig) {}

    fn begin_capture(&mut self) -> Result<(), MockError> {
        if self.fail_capture_begins > 0 {
            self.fail_capture_begins -= 1;
            return Err(MockError);
        }
        if self.playback_active {
            self.overlaps += 1;
        }
        self.capture_active = true;
        self.capture_begins += 1;
        Ok(())
    }

    fn end_capture(&mut self) {
        self.capture_active = false;
    }

    fn record(
        &mut self,
        samples: usize,
        _sample_rate: u32,
    ) -> Result<(), MockError> {
        if self.fail_record {
            return Err(MockError);
        }
        self.record_requests.push(samples);
        self.pending_record = Some(samples);
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.stall_record && self.pending_record.is_some()
    }

    fn take_recorded(&mut self, dst: &mut [i16]) -> usize {
        let n = self.pending_record.take().unwrap_or(0).min(dst.len());
        for (i, sample) in dst[..n].iter_mut().enumerate() {
            *sample = ramp(i);
        }
        n
    }

    fn configure_playback(&mut self, _config: &PlaybackConfig) {}

    fn begin_playback(&mut self) -> Result<(), MockError> {
        if self.fail_playback_begins > 0 {
            self.fail_playback_begins -= 1;
            return Err(MockError);
        }
        if self.capture_active {
            self.overlaps += 1;
        }
        self.playback_active = true;
        self.playback_begins += 1;
        Ok(())
    }

    fn end_playback(&mut self) {
        self.playback_active = false;
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume;
    }

    fn play_raw(
        &mut self,
        samples: &[i16],
        _sample_rate: u32,
    ) -> Result<(), MockError> {
        if !self.playback_active {
            return Err(MockError);
        }
        self.played.extend_from_slice(samples);
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.stall_playback
    }
}

/// Sample value the mock records at index `i`.
pub fn ramp(i: usize) -> i16 {
    (i as i16).wrapping_mul(3)
}

/// Little-endian PCM bytes for `samples` samples starting at `offset`.
pub fn pcm(offset: usize, samples: usize) -> Vec<u8> {
    (offset..offset + samples)
        .flat_map(|i| (i as i16).to_le_bytes())
        .collect()
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct Rig {
    pub lock: &'static PortLock,
    pub port: &'static Port,
    pub queues: &'static Queues,
}

pub fn rig(port: MockPort) -> Rig {
    Rig {
        lock: Box::leak(Box::new(PortLock::new())),
        port: Box::leak(Box::new(SharedPort::new(port))),
        queues: Box::leak(Box::new(PlaybackQueues::new())),
    }
}

impl Rig {
    pub fn capture(
        &self,
        config: CaptureConfig,
    ) -> CaptureDevice<'static, Raw, MockPort> {
        CaptureDevice::new(self.lock, self.port, config)
    }

    pub fn playback<L: WorkerLauncher<'static, Raw, MockPort>>(
        &self,
        launcher: L,
        config: PlaybackConfig,
    ) -> PlaybackDevice<'static, Raw, MockPort, L> {
        PlaybackDevice::new(
            self.lock,
            self.port,
            self.queues,
            launcher,
            config,
        )
    }

    pub async fn with_port<R>(&self, f: impl FnOnce(&mut MockPort) -> R) -> R {
        let mut port = self.port.lock().await;
        f(&mut port)
    }

    pub fn drain_events(&self) -> Vec<LifecycleEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.queues.events().try_receive() {
            events.push(event);
        }
        events
    }
}

/// Short timings so worker idle exits don't slow the suite down.
pub fn fast_playback() -> PlaybackConfig {
    PlaybackConfig {
        settle_ms: 1,
        drain_timeout_ms: 30,
        unit_timeout_ms: 20,
        ..Default::default()
    }
}

pub fn fast_capture() -> CaptureConfig {
    CaptureConfig { settle_ms: 1, ..Default::default() }
}

// ---------------------------------------------------------------------------
// Launchers
// ---------------------------------------------------------------------------

/// Runs each worker on its own thread, like a background RTOS task.
#[derive(Clone, Default)]
pub struct ThreadLauncher {
    pub launches: Arc<AtomicUsize>,
    pub fail_next: Arc<AtomicBool>,
    handles: Arc<StdMutex<Vec<JoinHandle<()>>>>,
}

impl ThreadLauncher {
    pub fn join_all(&self) {
        let handles: Vec<_> = self.handles.lock().unwrap().drain(..).collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}

impl WorkerLauncher<'static, Raw, MockPort> for ThreadLauncher {
    fn launch(&mut self, worker: Worker) -> Result<(), AudioError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AudioError::LaunchFailed);
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        let handle = std::thread::spawn(move || {
            futures::executor::block_on(worker.run());
        });
        self.handles.lock().unwrap().push(handle);
        Ok(())
    }
}

/// Parks workers so a test can run them inline at a chosen moment.
#[derive(Clone, Default)]
pub struct ManualLauncher {
    workers: Rc<RefCell<Vec<Worker>>>,
    pub fail_next: Rc<RefCell<bool>>,
}

impl ManualLauncher {
    pub fn pending(&self) -> usize {
        self.workers.borrow().len()
    }

    pub fn take(&self) -> Worker {
        self.workers.borrow_mut().remove(0)
    }
}

impl WorkerLauncher<'static, Raw, MockPort> for ManualLauncher {
    fn launch(&mut self, worker: Worker) -> Result<(), AudioError> {
        if self.fail_next.replace(false) {
            return Err(AudioError::LaunchFailed);
        }
        self.workers.borrow_mut().push(worker);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Polling helpers
// ---------------------------------------------------------------------------

const MAX_POLLS: usize = 2_000;

/// Poll until the playback device reaches `want`; `false` if it never does.
pub async fn poll_playback_until<L: WorkerLauncher<'static, Raw, MockPort>>(
    device: &mut PlaybackDevice<'static, Raw, MockPort, L>,
    want: DeviceState,
) -> bool {
    for _ in 0..MAX_POLLS {
        device.poll().await;
        if device.state() == want {
            return true;
        }
        Timer::after_millis(1).await;
    }
    false
}

/// Poll without sleeping; for devices driven by a [`ManualLauncher`].
pub async fn poll_playback_n<L: WorkerLauncher<'static, Raw, MockPort>>(
    device: &mut PlaybackDevice<'static, Raw, MockPort, L>,
    polls: usize,
) {
    for _ in 0..polls {
        device.poll().await;
    }
}
