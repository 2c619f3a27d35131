//! Internal logging hooks. Expand to nothing unless the `tracing` feature is on.

macro_rules! trace_debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!($($arg)*);
    };
}

macro_rules! trace_warn {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::warn!($($arg)*);
    };
}

pub(crate) use trace_debug;
pub(crate) use trace_warn;
