//! The error type shared by every fallible operation in the crate.
//!
//! Casting, storage and registration failures are local validation failures, so
//! they are reported directly to the caller. The only place errors are absorbed
//! is the try-get/try-set member API in [`crate::dynamic`].
use std::fmt::{self, Debug, Display};
use std::io;

/// Provides `PolycastError` and maps other errors to
/// convert to a `PolycastError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum PolycastError {
    /// A required argument was missing or empty.
    InvalidArgument(String),
    /// The requested type is not a facet known to the facet catalog.
    NotAnInterfaceOrClass(String),
    /// The entity is already bound to a class facet outside the requested
    /// class's inheritance chain.
    ConflictingClassCast {
        attached: &'static str,
        requested: &'static str,
    },
    /// An abstract member of the requested facet closure has no registered
    /// implementation.
    MissingImplementation {
        facet: &'static str,
        member: &'static str,
    },
    /// A registered implementation does not fit the member it targets.
    IncompatibleImplementation {
        facet: &'static str,
        member: String,
        reason: String,
    },
    /// A write went through a view while the entity was locked.
    InstanceLocked,
    /// A value does not fit the declared property or element type.
    TypeMismatch { expected: String, found: String },
    IoError(io::Error),
    JsonError(serde_json::Error),
}

/// Shorthand for results carrying a [`PolycastError`].
pub type Result<T> = std::result::Result<T, PolycastError>;

impl PolycastError {
    pub(crate) fn type_mismatch(expected: impl Debug, found: impl Debug) -> Self {
        PolycastError::TypeMismatch {
            expected: format!("{expected:?}"),
            found: format!("{found:?}"),
        }
    }
}

impl From<io::Error> for PolycastError {
    fn from(error: io::Error) -> Self {
        PolycastError::IoError(error)
    }
}

impl From<serde_json::Error> for PolycastError {
    fn from(error: serde_json::Error) -> Self {
        PolycastError::JsonError(error)
    }
}

impl std::error::Error for PolycastError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PolycastError::IoError(error) => Some(error),
            PolycastError::JsonError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for PolycastError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PolycastError::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            PolycastError::NotAnInterfaceOrClass(name) => {
                write!(f, "`{name}` is not a declared interface or class facet")
            }
            PolycastError::ConflictingClassCast {
                attached,
                requested,
            } => write!(
                f,
                "cannot cast to class `{requested}`: entity is already a `{attached}`"
            ),
            PolycastError::MissingImplementation { facet, member } => {
                write!(f, "no implementation registered for `{facet}::{member}`")
            }
            PolycastError::IncompatibleImplementation {
                facet,
                member,
                reason,
            } => write!(f, "incompatible implementation for `{facet}::{member}`: {reason}"),
            PolycastError::InstanceLocked => write!(f, "entity is locked"),
            PolycastError::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {expected}, found {found}")
            }
            PolycastError::IoError(error) => write!(f, "io error: {error}"),
            PolycastError::JsonError(error) => write!(f, "json error: {error}"),
        }
    }
}
