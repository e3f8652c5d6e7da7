//! Result and error types for implementer errors.

/// The result type for operations that can only fail because of a bug in
/// the compiler itself.
///
/// User mistakes are reported as diagnostics. An `Err` here means an internal
/// invariant was broken, e.g. a cloned reference that could not be remapped.
pub type InternalResult<T> = Result<T, InternalError>;

/// An internal compiler error: a broken invariant, not a problem in the
/// user's program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal compiler error: {message}")]
pub struct InternalError {
    /// Description of the broken invariant.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
