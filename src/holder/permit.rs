use core::fmt;
use core::marker::PhantomData;

use super::Holder;

/// Proof that the caller is the holder's own construction path.
///
/// Only the type's sanctioned holder mints one: either by passing it to the
/// constructor it is running, or through [`Holder::with_permit`] while that
/// constructor is on the calling thread's stack. A permit lives for one call
/// and cannot be kept. A value type that takes a `Permit` in every
/// constructor cannot be built anywhere else.
#[must_use]
pub struct Permit<'a, T> {
    _holder: PhantomData<&'a Holder<T>>,
}

impl<'a, T> Permit<'a, T> {
    #[inline]
    pub(super) const fn new() -> Self {
        Self { _holder: PhantomData }
    }
}

impl<T> fmt::Debug for Permit<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit")
            .field("type", &core::any::type_name::<T>())
            .finish()
    }
}
