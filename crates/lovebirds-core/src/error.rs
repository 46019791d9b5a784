//! Unified application error types for Lovebirds.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. The real-time core additionally
//! relies on [`ErrorKind`] to decide how a failure is surfaced to the
//! client (terminal credential failure vs. per-event error).

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The bearer credential is structurally invalid (not three segments).
    MalformedCredential,
    /// The Auth collaborator rejected the credential.
    Authentication,
    /// The caller is not allowed to act on the resource.
    Authorization,
    /// The requested resource was not found.
    NotFound,
    /// Input validation failed.
    Validation,
    /// The underlying channel transport failed or was dropped.
    Transport,
    /// Computing or delivering synchronization state failed.
    Synchronization,
    /// The channel was replaced by a newer channel of the same user.
    SessionEvicted,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A configuration error occurred.
    Configuration,
    /// An internal server error occurred.
    Internal,
    /// The service is temporarily unavailable.
    ServiceUnavailable,
}

impl ErrorKind {
    /// Wire code sent to clients in error events and HTTP bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedCredential => "MALFORMED_CREDENTIAL",
            Self::Authentication => "AUTHENTICATION",
            Self::Authorization => "AUTHORIZATION",
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION",
            Self::Transport => "TRANSPORT",
            Self::Synchronization => "SYNCHRONIZATION",
            Self::SessionEvicted => "SESSION_EVICTED",
            Self::Serialization => "SERIALIZATION",
            Self::Configuration => "CONFIGURATION",
            Self::Internal => "INTERNAL",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }

    /// Parses a wire code back into a kind.
    pub fn from_code(code: &str) -> Option<Self> {
        const ALL: [ErrorKind; 12] = [
            ErrorKind::MalformedCredential,
            ErrorKind::Authentication,
            ErrorKind::Authorization,
            ErrorKind::NotFound,
            ErrorKind::Validation,
            ErrorKind::Transport,
            ErrorKind::Synchronization,
            ErrorKind::SessionEvicted,
            ErrorKind::Serialization,
            ErrorKind::Configuration,
            ErrorKind::Internal,
            ErrorKind::ServiceUnavailable,
        ];
        ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Whether the failure invalidates the credential itself.
    ///
    /// Clients must discard the credential (log out) instead of retrying.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, Self::MalformedCredential | Self::Authentication)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The unified application error used throughout Lovebirds.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a malformed-credential error.
    pub fn malformed_credential(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedCredential, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// Create an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Create a synchronization error.
    pub fn synchronization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Synchronization, message)
    }

    /// Create a session-evicted error.
    pub fn session_evicted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SessionEvicted, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a service-unavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
