use thiserror::Error;

/// The error returned by operations on a crypto context
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// Data was added to (or a second result was requested from) a context that has already
    /// been finalized.
    #[error("context has already been finalized")]
    Final,

    /// The final key handed to `finalize` does not fit the algorithm, e.g. because it has the
    /// wrong size.
    #[error("final key is not valid for this context")]
    WrongKey,

    /// The algorithm does not allow independent copies of its state.
    #[error("context cannot be cloned")]
    NotCloneable,

    /// A state blob did not fit the algorithm.
    #[error("invalid context state: {0}")]
    InvalidState(&'static str),

    /// Tried to resume a context from a scheme describing a different algorithm, variant or
    /// init key.
    #[error("scheme is incompatible with this context")]
    Incompatible,
}

/// A scheme string could not be parsed.
///
/// Only the part before the first `:` is kept so key material never ends up in messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid scheme {scheme:?}: {reason}")]
pub struct SchemeError {
    scheme: String,
    reason: &'static str,
}

impl SchemeError {
    pub fn new(scheme: &str, reason: &'static str) -> Self {
        Self {
            scheme: scheme.split(':').next().unwrap_or_default().to_owned(),
            reason,
        }
    }

    pub fn reason(&self) -> &'static str {
        self.reason
    }
}
