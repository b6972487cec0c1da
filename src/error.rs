//! Error types for the handler.
//!
//! Every failure that crosses a component boundary is one of four kinds,
//! and callers dispatch on the kind rather than on message text:
//!
//! - [`Error::Structural`]: input bytes do not decode as any known frame
//! - [`Error::Behavioural`]: nothing to do (unknown device, empty queue)
//! - [`Error::Operational`]: transient collaborator failure, late arrival
//! - [`Error::Implementation`]: well-formed frame of the wrong type

use thiserror::Error;

/// Result type alias for handler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Handler error, a closed sum of four kinds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Input failed to decode as the expected shape
    #[error("structural: {0}")]
    Structural(String),

    /// Nothing to act on; sometimes surfaced, sometimes silent
    #[error("behavioural: {0}")]
    Behavioural(String),

    /// Transient I/O failure in a collaborator, or a late bundle arrival
    #[error("operational: {0}")]
    Operational(String),

    /// Structurally valid input of the wrong type for the operation
    #[error("implementation: {0}")]
    Implementation(String),
}

/// Discriminant of [`Error`], for dispatching without the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Structural,
    Behavioural,
    Operational,
    Implementation,
}

impl Error {
    /// Get the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Structural(_) => ErrorKind::Structural,
            Error::Behavioural(_) => ErrorKind::Behavioural,
            Error::Operational(_) => ErrorKind::Operational,
            Error::Implementation(_) => ErrorKind::Implementation,
        }
    }
}
