use derive_more::From;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

use crate::{AudioError, CHUNK_CAPACITY, QUEUE_DEPTH};

/// Worker lifecycle as seen by the polling context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, From)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LifecycleEvent {
    Starting,
    Started,
    /// One chunk went out to the speaker.
    Progress,
    Stopping,
    /// Terminal; the worker has exited and the port may be released.
    Stopped,
    Warning(AudioError),
}

/// One slot of the data queue.
#[derive(Debug, Clone, Default)]
pub struct DataChunk {
    payload: Vec<u8, CHUNK_CAPACITY>,
    end_of_stream: bool,
}

impl DataChunk {
    /// Copy `bytes` into a chunk; `None` if they exceed [`CHUNK_CAPACITY`].
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        Vec::from_slice(bytes)
            .ok()
            .map(|payload| Self { payload, end_of_stream: false })
    }

    /// The marker a stopping device sends to end the stream.
    pub fn end_of_stream() -> Self {
        Self { payload: Vec::new(), end_of_stream: true }
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

pub type DataChannel<M> = Channel<M, DataChunk, QUEUE_DEPTH>;
pub type EventChannel<M> = Channel<M, LifecycleEvent, QUEUE_DEPTH>;

/// The two channels between a playback device and its worker.
///
/// These are the only state the polling context and the worker share.
pub struct PlaybackQueues<M: RawMutex> {
    data: DataChannel<M>,
    events: EventChannel<M>,
}

impl<M: RawMutex> PlaybackQueues<M> {
    pub const fn new() -> Self {
        Self { data: Channel::new(), events: Channel::new() }
    }

    /// Caller to worker.
    pub fn data(&self) -> &DataChannel<M> {
        &self.data
    }

    /// Worker to poller.
    pub fn events(&self) -> &EventChannel<M> {
        &self.events
    }
}

impl<M: RawMutex> Default for PlaybackQueues<M> {
    fn default() -> Self {
        Self::new()
    }
}
