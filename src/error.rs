//! The error raised when the singleton construction protocol is violated.

use core::fmt;

/// A singleton was accessed or constructed outside the sanctioned path.
///
/// Each variant carries the value type's name for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidState {
    /// The accessor was called from inside the value type's own constructor.
    ReentrantAccess {
        /// Name of the value type.
        type_name: &'static str,
    },
    /// Construction was attempted outside the running constructor of the
    /// type's sanctioned holder.
    DirectConstruction {
        /// Name of the value type.
        type_name: &'static str,
    },
    /// A construction permit was requested after the instance already exists.
    AlreadyConstructed {
        /// Name of the value type.
        type_name: &'static str,
    },
    /// A non-blocking access found another thread constructing the instance.
    ConstructionInProgress {
        /// Name of the value type.
        type_name: &'static str,
    },
}

impl InvalidState {
    /// Returns the name of the value type involved.
    pub fn type_name(&self) -> &'static str {
        match *self {
            Self::ReentrantAccess { type_name }
            | Self::DirectConstruction { type_name }
            | Self::AlreadyConstructed { type_name }
            | Self::ConstructionInProgress { type_name } => type_name,
        }
    }
}

impl fmt::Display for InvalidState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReentrantAccess { type_name } => {
                write!(f, "singleton `{type_name}` accessed while it is being constructed")
            }
            Self::DirectConstruction { type_name } => {
                write!(f, "singleton `{type_name}` constructed outside its holder")
            }
            Self::AlreadyConstructed { type_name } => {
                write!(f, "singleton `{type_name}` constructed after its instance was published")
            }
            Self::ConstructionInProgress { type_name } => {
                write!(f, "singleton `{type_name}` is being constructed by another thread")
            }
        }
    }
}

impl std::error::Error for InvalidState {}

impl From<InvalidState> for std::io::Error {
    fn from(err: InvalidState) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, err)
    }
}
