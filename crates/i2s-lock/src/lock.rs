use portable_atomic::{AtomicU8, Ordering};

use crate::holder::Holder;

const FREE: u8 = 0;

/// Binary ownership token over the shared port.
///
/// The token is free until a device wins [`try_acquire`](Self::try_acquire)
/// and stays taken until that same device calls [`release`](Self::release).
/// There is no timeout and no queue of waiters.
pub struct PortLock {
    owner: AtomicU8,
}

impl PortLock {
    /// Create a free lock.
    pub const fn new() -> Self {
        Self { owner: AtomicU8::new(FREE) }
    }

    /// Take the port for `holder` if nobody owns it.
    ///
    /// Returns `false` immediately when the port is owned, including when it
    /// is owned by `holder` itself.
    pub fn try_acquire(&self, holder: Holder) -> bool {
        self.owner
            .compare_exchange(
                FREE,
                holder.id(),
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    /// Give the port back.
    ///
    /// A no-op unless `holder` currently owns the port, so teardown paths can
    /// call it without tracking whether they got as far as acquiring.
    pub fn release(&self, holder: Holder) {
        let _ = self.owner.compare_exchange(
            holder.id(),
            FREE,
            Ordering::Release,
            Ordering::Relaxed,
        );
    }

    /// Current owner, for diagnostics only.
    pub fn holder(&self) -> Option<Holder> {
        Holder::from_id(self.owner.load(Ordering::Relaxed))
    }

    /// Returns `true` while some device owns the port.
    pub fn is_locked(&self) -> bool {
        self.owner.load(Ordering::Relaxed) != FREE
    }
}

impl Default for PortLock {
    fn default() -> Self {
        Self::new()
    }
}
