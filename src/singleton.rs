//! The `Singleton` trait: one lazily constructed instance per value type.

use crate::error::InvalidState;
use crate::holder::{Holder, Permit};

/// A type with exactly one process-wide instance, built on first access.
///
/// Implementors supply [`construct`](Singleton::construct); callers use
/// [`instance`](Singleton::instance). Keep every other constructor of the
/// type private, or make it require a [`Permit`], so that the holder is the
/// only way to obtain a value.
///
/// # Example
///
/// ```rust
/// use lazy_singleton::{static_holder, InvalidState, Permit, Singleton};
///
/// struct Config {
///     name: String,
/// }
///
/// impl Singleton for Config {
///     type Error = InvalidState;
///
///     fn construct(_permit: Permit<'_, Self>) -> Result<Self, Self::Error> {
///         Ok(Config { name: "prod".into() })
///     }
///
///     static_holder!(Config);
/// }
///
/// let a = Config::instance().unwrap();
/// let b = Config::instance().unwrap();
/// assert!(core::ptr::eq(a, b));
/// assert_eq!(a.name, "prod");
/// ```
pub trait Singleton: Sized + Send + Sync + 'static {
    /// Error produced by construction. Must be able to carry protocol violations.
    type Error: From<InvalidState>;

    /// Builds the instance. Called at most once successfully, by the holder.
    ///
    /// # Errors
    /// Whatever the type's initialization can fail with. The error reaches the
    /// caller of [`instance`](Singleton::instance) unchanged, and the next
    /// access retries.
    ///
    /// # Deadlocks
    /// The holder's lock is held for the whole call. A call to
    /// [`instance`](Singleton::instance) from this thread fails with
    /// [`InvalidState::ReentrantAccess`], but one from another thread waits for
    /// this call to return. Do not join or wait on a thread that calls
    /// `instance`; have it use [`try_instance`](Singleton::try_instance), which
    /// fails with [`InvalidState::ConstructionInProgress`] instead.
    fn construct(permit: Permit<'_, Self>) -> Result<Self, Self::Error>;

    /// Returns the holder backing this type.
    ///
    /// Defaults to the process-wide [`registry`](crate::registry), which
    /// serves repeat lookups from a per-thread cache. Override with
    /// [`static_holder!`](crate::static_holder) to get a dedicated `static`.
    ///
    /// Must return the same holder on every call: it is the only holder that
    /// will construct `Self`.
    fn holder() -> &'static Holder<Self> {
        crate::registry::holder::<Self>()
    }

    /// Returns the shared instance, constructing it on first access.
    ///
    /// # Errors
    /// [`InvalidState::ReentrantAccess`] when called from inside
    /// [`construct`](Singleton::construct), or the constructor's own error.
    fn instance() -> Result<&'static Self, Self::Error> {
        Self::holder().get_instance()
    }

    /// Returns the shared instance without waiting on another thread's
    /// construction.
    ///
    /// # Errors
    /// [`InvalidState::ConstructionInProgress`] while another thread is
    /// constructing, otherwise as [`instance`](Singleton::instance).
    fn try_instance() -> Result<&'static Self, Self::Error> {
        Self::holder().try_get_instance()
    }
}

/// Implements [`Singleton::holder`] with a dedicated `static` [`Holder`].
///
/// Use inside an `impl Singleton for Type` block. `Type` must not be generic.
#[macro_export]
macro_rules! static_holder {
    ($ty:ty) => {
        fn holder() -> &'static $crate::Holder<$ty> {
            static HOLDER: $crate::Holder<$ty> = $crate::Holder::new();
            &HOLDER
        }
    };
}
