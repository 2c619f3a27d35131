//! `RawMutex` — a parking mutex with a spin phase, used to serialize holder initialization.

use super::wait_queue::{WaitNode, WaitQueue};
use crossbeam_utils::Backoff;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU8, Ordering};

/// A blocking mutex that guards no data of its own.
///
/// Holders use it to serialize the slow path of initialization; the value it
/// protects lives next to it and is published through separate atomics.
///
/// # States
/// - 0: Unlocked
/// - 1: Locked, no waiters (likely)
/// - 2: Locked, waiters may exist (contended)
pub struct RawMutex {
    state: AtomicU8,
    queue: WaitQueue,
}

// Safety: all shared state is atomic or protected by the queue spinlock.
unsafe impl Sync for RawMutex {}
unsafe impl Send for RawMutex {}

impl RawMutex {
    const UNLOCKED: u8 = 0;
    const LOCKED: u8 = 1;
    const CONTENDED: u8 = 2;

    /// Creates an unlocked mutex.
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(Self::UNLOCKED),
            queue: WaitQueue::new(),
        }
    }

    /// Blocks until the lock is acquired. There is no timeout.
    #[inline]
    pub fn lock(&self) -> RawMutexGuard<'_> {
        if !self.try_acquire() {
            self.lock_slow();
        }
        RawMutexGuard { mutex: self }
    }

    /// Attempts to acquire the lock without blocking.
    #[inline]
    pub fn try_lock(&self) -> Option<RawMutexGuard<'_>> {
        self.try_acquire().then(|| RawMutexGuard { mutex: self })
    }

    /// Returns `true` if some thread currently holds the lock.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) != Self::UNLOCKED
    }

    #[inline]
    fn try_acquire(&self) -> bool {
        self.state
            .compare_exchange(Self::UNLOCKED, Self::LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[cold]
    fn lock_slow(&self) {
        // Spin
        let backoff = Backoff::new();
        while !backoff.is_completed() {
            if self.state.load(Ordering::Relaxed) == Self::UNLOCKED && self.try_acquire() {
                return;
            }
            backoff.snooze();
        }

        // Park
        loop {
            let node = WaitNode::new();

            self.queue.lock();
            // Acquire as contended: another thread may be queued behind us,
            // so our unlock must take the slow path and check the queue.
            if self.state.swap(Self::CONTENDED, Ordering::Acquire) == Self::UNLOCKED {
                self.queue.unlock();
                return;
            }
            // SAFETY: queue lock held; `node` outlives its time in the queue
            // because we block in `wait` until a waker has popped it.
            unsafe { self.queue.push_locked(NonNull::from(&node)) };
            self.queue.unlock();

            node.wait();
        }
    }

    fn unlock(&self) {
        if self
            .state
            .compare_exchange(Self::LOCKED, Self::UNLOCKED, Ordering::Release, Ordering::Relaxed)
            .is_ok()
        {
            return;
        }
        self.unlock_slow();
    }

    #[cold]
    fn unlock_slow(&self) {
        self.queue.lock();
        self.state.store(Self::UNLOCKED, Ordering::Release);
        // SAFETY: queue lock held; a popped node's owner is still blocked in `wait`.
        unsafe {
            if let Some(node) = self.queue.pop_locked() {
                WaitNode::wake(node);
            }
        }
        self.queue.unlock();
    }
}

impl Default for RawMutex {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the [`RawMutex`] when dropped, including during unwinding.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct RawMutexGuard<'a> {
    mutex: &'a RawMutex,
}

impl Drop for RawMutexGuard<'_> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}
