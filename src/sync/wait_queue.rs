use crossbeam_utils::Backoff;
use std::cell::UnsafeCell;
use std::marker::PhantomPinned;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Thread};

/// A node in the intrusive wait queue.
/// Must stay pinned to the stack of the waiting thread until `wait` returns.
pub(crate) struct WaitNode {
    thread: Thread,
    notified: AtomicBool,
    next: UnsafeCell<Option<NonNull<WaitNode>>>,
    _pin: PhantomPinned,
}

impl WaitNode {
    pub(crate) fn new() -> Self {
        Self {
            thread: thread::current(),
            notified: AtomicBool::new(false),
            next: UnsafeCell::new(None),
            _pin: PhantomPinned,
        }
    }

    /// Parks the current thread until another thread calls `wake` on this node.
    ///
    /// Spurious unparks are absorbed by re-checking `notified`.
    pub(crate) fn wait(&self) {
        while !self.notified.load(Ordering::Acquire) {
            thread::park();
        }
    }

    /// Wakes the thread waiting on `node`.
    ///
    /// # Safety
    /// `node` must have been popped from the queue and its owner must still be
    /// blocked in `wait`. The node may be freed as soon as `notified` is stored,
    /// so the thread handle is cloned first.
    pub(crate) unsafe fn wake(node: NonNull<WaitNode>) {
        let thread = node.as_ref().thread.clone();
        node.as_ref().notified.store(true, Ordering::Release);
        thread.unpark();
    }
}

/// A FIFO queue of waiting threads.
///
/// Uses a small spinlock to protect the linked list operations.
/// Since operations are just pointer swaps, contention is minimal.
pub(crate) struct WaitQueue {
    head: UnsafeCell<Option<NonNull<WaitNode>>>,
    tail: UnsafeCell<Option<NonNull<WaitNode>>>,
    lock: AtomicBool,
}

impl WaitQueue {
    pub(crate) const fn new() -> Self {
        Self {
            head: UnsafeCell::new(None),
            tail: UnsafeCell::new(None),
            lock: AtomicBool::new(false),
        }
    }

    pub(crate) fn lock(&self) {
        let backoff = Backoff::new();
        while self.lock.swap(true, Ordering::Acquire) {
            backoff.spin();
        }
    }

    pub(crate) fn unlock(&self) {
        self.lock.store(false, Ordering::Release);
    }

    /// Adds a node to the back of the queue.
    ///
    /// # Safety
    /// Caller must hold the queue lock. The node must stay valid and pinned
    /// until it has been popped and woken.
    pub(crate) unsafe fn push_locked(&self, node: NonNull<WaitNode>) {
        *node.as_ref().next.get() = None;

        let tail = &mut *self.tail.get();
        match *tail {
            Some(t) => *t.as_ref().next.get() = Some(node),
            None => *self.head.get() = Some(node),
        }
        *tail = Some(node);
    }

    /// Removes and returns the head node.
    ///
    /// # Safety
    /// Caller must hold the queue lock.
    pub(crate) unsafe fn pop_locked(&self) -> Option<NonNull<WaitNode>> {
        let head = &mut *self.head.get();
        let ret = *head;
        if let Some(h) = ret {
            *head = *h.as_ref().next.get();
            if head.is_none() {
                *self.tail.get() = None;
            }
        }
        ret
    }

    /// Checks if the queue is empty.
    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.lock();
        // SAFETY: the queue lock is held.
        let empty = unsafe { (*self.head.get()).is_none() };
        self.unlock();
        empty
    }
}

unsafe impl Sync for WaitQueue {}
unsafe impl Send for WaitQueue {}
