//! Blocking primitives backing the holder's slow path.

pub mod mutex;
pub(crate) mod thread_token;
pub(crate) mod wait_queue;

pub use mutex::{RawMutex, RawMutexGuard};
