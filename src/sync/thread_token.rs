//! Cheap, process-unique thread identities.
//!
//! `std::thread::ThreadId` cannot be stored in an atomic, so each thread
//! draws a non-zero `usize` from a global counter on first use. Zero is
//! reserved to mean "no thread".

use std::sync::atomic::{AtomicUsize, Ordering};

/// Identity value meaning "no thread".
pub const NONE: usize = 0;

static NEXT: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static TOKEN: usize = NEXT.fetch_add(1, Ordering::Relaxed);
}

/// Returns the calling thread's identity. Never returns [`NONE`].
#[inline]
pub fn current() -> usize {
    TOKEN.with(|t| *t)
}
