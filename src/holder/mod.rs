//! `Holder` — a lazily constructed, exactly-once, process-shareable instance slot.
//!
//! The fast path is a single acquire load of the state byte. The slow path
//! takes a [`RawMutex`], re-checks the slot, and runs the constructor with the
//! construction permission set to the calling thread's identity.
//!
//! Any holder works as a plain once-cell. For a [`Singleton`] type only the
//! holder returned by [`Singleton::holder`] runs the constructor or mints a
//! [`Permit`]; every other `Holder<T>` is refused with
//! [`InvalidState::DirectConstruction`].

mod permit;
mod state;

#[cfg(test)]
mod tests;

use core::{
    any::type_name,
    cell::UnsafeCell,
    fmt,
    mem::MaybeUninit,
    sync::atomic::{AtomicU8, AtomicUsize, Ordering},
};

use crate::error::InvalidState;
use crate::singleton::Singleton;
use crate::sync::{thread_token, RawMutex, RawMutexGuard};
use crate::trace::{trace_debug, trace_warn};

pub use permit::Permit;
pub use state::State;

/// A slot holding at most one `T`, constructed on first access.
///
/// Usable as a `static` (see [`static_holder!`](crate::static_holder)) or as
/// an ordinary value shared through `Arc` or scoped threads.
pub struct Holder<T> {
    value: UnsafeCell<MaybeUninit<T>>,
    state: AtomicU8,
    /// Construction permission: identity of the thread running the
    /// constructor, or `thread_token::NONE`.
    constructor: AtomicUsize,
    lock: RawMutex,
}

// SAFETY: the value is written once under `lock` and published with release
// ordering; afterwards only shared references are handed out.
unsafe impl<T: Send + Sync> Sync for Holder<T> {}
unsafe impl<T: Send> Send for Holder<T> {}

impl<T> Holder<T> {
    /// Creates an empty holder.
    pub const fn new() -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
            state: AtomicU8::new(State::UNINIT),
            constructor: AtomicUsize::new(thread_token::NONE),
            lock: RawMutex::new(),
        }
    }

    /// Returns the current position in the initialization state machine.
    #[inline]
    pub fn state(&self) -> State {
        State::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Returns `true` once the instance has been published.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == State::INIT
    }

    /// Returns `true` if the calling thread is currently running this
    /// holder's constructor.
    #[inline]
    pub fn is_constructing_on_current_thread(&self) -> bool {
        // Relaxed: a thread only ever compares against its own identity,
        // and it always observes its own latest store.
        self.constructor.load(Ordering::Relaxed) == thread_token::current()
    }

    /// Returns the instance if it has been published. Never blocks or constructs.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        if self.is_initialized() {
            // SAFETY: state is `Initialized`, which is stored with release
            // ordering only after the value has been written.
            Some(unsafe { self.get_unchecked() })
        } else {
            None
        }
    }

    /// Returns the instance, constructing it with `f` if the slot is empty.
    ///
    /// Exactly one call to `f` succeeds over the holder's lifetime. Concurrent
    /// callers block until the constructing thread finishes; if it fails, the
    /// next caller to take the lock runs its own `f`.
    ///
    /// This is the plain once-cell entry point: `f` receives no [`Permit`],
    /// so it cannot build a [`Singleton`] that guards its constructors.
    ///
    /// # Errors
    /// - [`InvalidState::ReentrantAccess`] (converted into `E`) if called from
    ///   inside this holder's own constructor.
    /// - Any error returned by `f`, unchanged. The holder stays empty.
    ///
    /// # Deadlocks
    /// `f` must not wait on another thread that blocks on this holder.
    pub fn get_or_try_init<E, F>(&self, f: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<InvalidState>,
    {
        self.reject_reentrant()?;
        if let Some(value) = self.get() {
            return Ok(value);
        }
        self.initialize(self.lock.lock(), f)
    }

    /// Infallible-constructor form of [`get_or_try_init`](Self::get_or_try_init).
    ///
    /// # Errors
    /// [`InvalidState::ReentrantAccess`] if called from inside the constructor.
    pub fn get_or_init<F>(&self, f: F) -> Result<&T, InvalidState>
    where
        F: FnOnce() -> T,
    {
        self.get_or_try_init(|| Ok(f()))
    }

    fn reject_reentrant(&self) -> Result<(), InvalidState> {
        if self.is_constructing_on_current_thread() {
            let type_name = type_name::<T>();
            trace_warn!(type_name, "singleton accessed from its own constructor");
            return Err(InvalidState::ReentrantAccess { type_name });
        }
        Ok(())
    }

    #[cold]
    fn initialize<E, F>(&self, _lock: RawMutexGuard<'_>, f: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        // Another thread may have published while we waited.
        if let Some(value) = self.get() {
            return Ok(value);
        }

        let permission = Permission::grant(self);
        trace_debug!(type_name = type_name::<T>(), "constructing singleton");

        let value = match f() {
            Ok(value) => value,
            Err(err) => {
                trace_debug!(type_name = type_name::<T>(), "singleton construction failed");
                return Err(err);
            }
        };

        // SAFETY: the lock is held and the state is `Constructing`, so no
        // other thread reads or writes the slot.
        unsafe { (*self.value.get()).write(value) };
        self.state.store(State::INIT, Ordering::Release);
        drop(permission);

        trace_debug!(type_name = type_name::<T>(), "singleton published");
        // SAFETY: written and published above.
        Ok(unsafe { self.get_unchecked() })
    }

    /// # Safety
    /// The state must be `Initialized`.
    #[inline]
    unsafe fn get_unchecked(&self) -> &T {
        debug_assert!(self.is_initialized());
        (*self.value.get()).assume_init_ref()
    }
}

impl<T: Singleton> Holder<T> {
    /// Returns `true` if this is the holder returned by [`Singleton::holder`].
    ///
    /// Only that holder constructs `T` or hands out permits for it.
    #[inline]
    pub fn is_sanctioned(&self) -> bool {
        core::ptr::eq(self, T::holder())
    }

    /// Returns the instance, constructing it with [`Singleton::construct`] on
    /// first access. Blocks while another thread is constructing.
    ///
    /// # Errors
    /// - [`InvalidState::ReentrantAccess`] if called from inside the constructor.
    /// - [`InvalidState::DirectConstruction`] if the slot is empty and this is
    ///   not the type's sanctioned holder.
    /// - The constructor's own error, unchanged.
    ///
    /// # Deadlocks
    /// See [`Singleton::construct`].
    pub fn get_instance(&self) -> Result<&T, T::Error> {
        self.reject_reentrant()?;
        if let Some(value) = self.get() {
            return Ok(value);
        }
        self.reject_unsanctioned()?;
        self.initialize(self.lock.lock(), || T::construct(Permit::new()))
    }

    /// Like [`get_instance`](Self::get_instance), but fails instead of
    /// blocking when another thread is constructing.
    ///
    /// # Errors
    /// [`InvalidState::ConstructionInProgress`] if the lock is held elsewhere,
    /// otherwise as [`get_instance`](Self::get_instance).
    pub fn try_get_instance(&self) -> Result<&T, T::Error> {
        self.reject_reentrant()?;
        if let Some(value) = self.get() {
            return Ok(value);
        }
        self.reject_unsanctioned()?;
        match self.lock.try_lock() {
            Some(lock) => self.initialize(lock, || T::construct(Permit::new())),
            // The holder of the lock may just have published.
            None => match self.get() {
                Some(value) => Ok(value),
                None => {
                    let type_name = type_name::<T>();
                    trace_debug!(type_name, "singleton busy, not waiting");
                    Err(InvalidState::ConstructionInProgress { type_name }.into())
                }
            },
        }
    }

    /// Runs `f` with a construction permit, from inside the running constructor.
    ///
    /// This is the cooperative check for value types that expose their own
    /// constructor function. The permit only lives for the call to `f`, so it
    /// cannot be kept for later.
    ///
    /// # Errors
    /// - [`InvalidState::AlreadyConstructed`] if the instance is already published.
    /// - [`InvalidState::DirectConstruction`] if this is not the sanctioned
    ///   holder or no construction is in flight on the calling thread.
    pub fn with_permit<R, F>(&self, f: F) -> Result<R, InvalidState>
    where
        F: FnOnce(Permit<'_, T>) -> R,
    {
        let type_name = type_name::<T>();
        if self.is_initialized() {
            trace_warn!(type_name, "singleton construction attempted after publication");
            return Err(InvalidState::AlreadyConstructed { type_name });
        }
        if !self.is_constructing_on_current_thread() || !self.is_sanctioned() {
            trace_warn!(type_name, "singleton construction attempted outside its holder");
            return Err(InvalidState::DirectConstruction { type_name });
        }
        Ok(f(Permit::new()))
    }

    fn reject_unsanctioned(&self) -> Result<(), InvalidState> {
        if self.is_sanctioned() {
            return Ok(());
        }
        let type_name = type_name::<T>();
        trace_warn!(type_name, "singleton constructed through a foreign holder");
        Err(InvalidState::DirectConstruction { type_name })
    }
}

/// Holds the construction permission for the duration of one constructor call.
///
/// Dropping it clears the permission and, unless the value was published,
/// rolls the state back to `Uninitialized`. Runs on error and on unwind.
struct Permission<'a, T> {
    holder: &'a Holder<T>,
}

impl<'a, T> Permission<'a, T> {
    /// Caller must hold `holder.lock`.
    fn grant(holder: &'a Holder<T>) -> Self {
        holder.state.store(State::CONSTRUCTING, Ordering::Relaxed);
        holder
            .constructor
            .store(thread_token::current(), Ordering::Relaxed);
        Self { holder }
    }
}

impl<T> Drop for Permission<'_, T> {
    fn drop(&mut self) {
        self.holder
            .constructor
            .store(thread_token::NONE, Ordering::Relaxed);
        if self.holder.state.load(Ordering::Relaxed) == State::CONSTRUCTING {
            self.holder.state.store(State::UNINIT, Ordering::Relaxed);
        }
    }
}

impl<T> Default for Holder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Holder<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == State::INIT {
            // SAFETY: exclusive access; the value was written and never moved out.
            unsafe { self.value.get_mut().assume_init_drop() };
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Holder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Holder");
        d.field("state", &self.state());
        match self.get() {
            Some(value) => d.field("value", value),
            None => d.field("value", &format_args!("<empty>")),
        };
        d.finish()
    }
}
