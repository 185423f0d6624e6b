//! Error types for the expense bot.
//!
//! Internally we use `anyhow` (`Res<T>`) and add context as errors bubble up. At the public
//! boundary of a module, errors are tagged with an `ErrorType` using `IntoResult::pub_result` so
//! that callers (the analysis pipeline, the chat front-end) can decide what to do based on the kind
//! of failure rather than on the message text.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// Result type used for internal plumbing.
pub(crate) type Res<T> = anyhow::Result<T>;

/// Result type returned from public functions.
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of failure that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// A remote endpoint (spreadsheet web app or inference server) could not be reached or
    /// answered with a non-success HTTP status.
    Connectivity,
    /// The input was malformed: bad amount, empty category, unknown period and so on.
    Validation,
    /// The inference server is up but the requested model is not loaded.
    ModelUnavailable,
    /// The configuration is missing or invalid.
    Config,
    /// A remote service answered, but reported a failure or sent something we could not read.
    Service,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// An error carrying its `ErrorType` along with the full `anyhow` context chain.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub fn new(error_type: ErrorType, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            inner: inner.into(),
        }
    }

    /// Creates a `Validation` error from a message.
    pub fn validation(message: impl Display + Debug + Send + Sync + 'static) -> Self {
        Self::new(ErrorType::Validation, anyhow::Error::msg(message))
    }

    /// Creates a `Connectivity` error from a message.
    pub fn connectivity(message: impl Display + Debug + Send + Sync + 'static) -> Self {
        Self::new(ErrorType::Connectivity, anyhow::Error::msg(message))
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    /// True for failures that mean the backend cannot serve any request right now, as opposed to a
    /// single bad request or reply.
    pub fn is_backend_down(&self) -> bool {
        matches!(
            self.error_type,
            ErrorType::Connectivity | ErrorType::ModelUnavailable
        )
    }

    /// Adds a line of context while keeping the `ErrorType`.
    pub fn context(self, context: impl Display + Send + Sync + 'static) -> Self {
        Self {
            error_type: self.error_type,
            inner: self.inner.context(context),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.inner)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.inner)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// Converts an internal result into a public `Result` tagged with an `ErrorType`.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}
