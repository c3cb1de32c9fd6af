//! Error types for Portcullis.

use crate::action::HttpAction;

/// Errors that can occur while securing a request.
///
/// Two variants are control flow rather than failures:
/// [`Error::RequiredAction`] and [`Error::CredentialsInvalid`]. The logics
/// intercept them and turn them into an outward HTTP action. Everything
/// else is a technical failure and bubbles up to the caller.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A concrete protocol-level action must be taken (redirect, 401, ...).
    #[error("HTTP action required: {0}")]
    RequiredAction(HttpAction),

    /// Presented credentials were rejected.
    #[error("Invalid credentials: {message}")]
    CredentialsInvalid {
        /// Why the credentials were rejected
        message: String,
    },

    /// The web context has no session store attached.
    #[error("No session store available for this web context")]
    NoSessionStore,

    /// Session store failure.
    #[error("Session error: {message}")]
    Session {
        /// What went wrong
        message: String,
        /// Source error if available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error (unknown client, matcher or authorizer names, bad settings).
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// Any other failure raised by a capability.
    #[error("Technical error: {message}")]
    Technical {
        /// Human-readable error message
        message: String,
        /// Source error if available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON serialization/deserialization error (profiles, session values).
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (settings files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The execution context a task was scheduled on is gone.
    #[error("Execution context closed before the operation completed")]
    ContextClosed,
}

/// Convenience `Result` type alias for Portcullis operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns whether this error is an expected control-flow signal
    /// rather than a failure.
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            Error::RequiredAction(_) | Error::CredentialsInvalid { .. }
        )
    }

    /// Returns the HTTP action carried by a [`Error::RequiredAction`].
    pub fn required_action(&self) -> Option<&HttpAction> {
        match self {
            Error::RequiredAction(action) => Some(action),
            _ => None,
        }
    }

    /// Creates a new invalid-credentials error.
    pub fn credentials<S: Into<String>>(message: S) -> Self {
        Error::CredentialsInvalid {
            message: message.into(),
        }
    }

    /// Creates a new technical error with a message.
    pub fn technical<S: Into<String>>(message: S) -> Self {
        Error::Technical {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new technical error with a message and source error.
    pub fn technical_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Technical {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new session error.
    pub fn session<S: Into<String>>(message: S) -> Self {
        Error::Session {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}

impl From<HttpAction> for Error {
    fn from(action: HttpAction) -> Self {
        Error::RequiredAction(action)
    }
}
