//! # `lazy-singleton` - Exactly-once process-wide instances
//!
//! Lazy, thread-safe construction of a single shared instance per value type,
//! with construction guarded so that the holder is the only way to obtain a
//! value.
//!
//! ## Guarantees
//!
//! - **Exactly once**: under any number of concurrent callers, one
//!   constructor call succeeds and every caller observes that instance.
//! - **Safe publication**: the value is fully written before the state byte is
//!   stored with release ordering; readers load it with acquire ordering.
//! - **Lock-free fast path**: once published, access is a single atomic load.
//! - **Retry on failure**: a constructor error (or panic) leaves the holder
//!   empty and unlocked; the next caller constructs again.
//! - **Guarded construction**: constructors receive a [`Permit`] that only the
//!   type's own holder ([`Singleton::holder`]) can mint, and only for the
//!   length of one call. Any other `Holder<T>` refuses to construct. Types that
//!   expose their own constructor can demand a permit through
//!   [`Holder::with_permit`], which rejects any caller that is not the
//!   holder's in-flight construction with [`InvalidState`].
//!
//! ## State machine
//!
//! `Uninitialized → Constructing → Initialized`. Failure returns to
//! `Uninitialized`; `Initialized` is terminal. See [`State`].
//!
//! ## Architecture
//!
//! 1. **[`Holder<T>`]**: the once-cell. Double-checked locking over a
//!    [`RawMutex`](sync::RawMutex), with the construction permission stored
//!    as the identity of the constructing thread.
//! 2. **[`Singleton`]**: the per-type contract (`construct` + `instance`).
//! 3. **[`registry`]**: type-keyed holders for types that don't declare a
//!    `static` through [`static_holder!`].
//!
//! ## Example
//!
//! ```rust
//! use lazy_singleton::Holder;
//!
//! struct Pool {
//!     size: usize,
//! }
//!
//! static POOL: Holder<Pool> = Holder::new();
//!
//! let pool = POOL.get_or_init(|| Pool { size: 8 }).unwrap();
//! assert_eq!(pool.size, 8);
//! assert!(core::ptr::eq(pool, POOL.get_or_init(|| Pool { size: 1 }).unwrap()));
//! ```
//!
//! ## Features
//!
//! - `tracing`: emit `tracing` events for construction and protocol violations.

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod error;
pub mod holder;
pub mod registry;
pub mod singleton;
pub mod sync;

mod trace;

pub use error::InvalidState;
pub use holder::{Holder, Permit, State};
pub use singleton::Singleton;

// Compile-time assertions for memory layout
const _: () = {
    use core::mem;

    // Permits are ZSTs.
    assert!(mem::size_of::<Permit<'static, u64>>() == 0);

    // The state machine fits in one byte.
    assert!(mem::size_of::<State>() == 1);

    // A holder is the value plus a few words of bookkeeping; no heap.
    assert!(mem::size_of::<Holder<u64>>() <= mem::size_of::<usize>() * 8);
};
