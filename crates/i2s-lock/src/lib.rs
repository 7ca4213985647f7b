#![no_std]
//! Ownership token for an I2S port shared by a capture and a playback path.
//!
//! Only one path may drive the port at a time. Acquisition never blocks: a
//! path that loses the race simply tries again on its next poll step.

mod holder;
mod lock;

pub use holder::Holder;
pub use lock::PortLock;
