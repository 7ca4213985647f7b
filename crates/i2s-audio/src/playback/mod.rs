//! Speaker side of the shared port: a polled state machine feeding a
//! background streaming worker over two bounded queues.

mod device;
mod events;
mod worker;

pub use device::PlaybackDevice;
pub use events::{
    DataChannel, DataChunk, EventChannel, LifecycleEvent, PlaybackQueues,
};
pub use worker::{StreamWorker, WorkerLauncher};
