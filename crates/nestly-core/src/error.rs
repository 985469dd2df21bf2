//! Error type shared by every Nestly crate.
//!
//! Lower layers convert their failures into [`AppError`] so callers can use
//! `?` across crate boundaries and the api crate can pick a status code from
//! [`ErrorKind`] alone.

use std::fmt;
use thiserror::Error;

/// Failure category.
///
/// Authorization failures are reported as [`ErrorKind::NotFound`] so a caller
/// cannot discover notifications it does not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Database,
    Serialization,
    Configuration,
    ExternalService,
    Timeout,
    ServiceUnavailable,
    Internal,
}

impl ErrorKind {
    /// Stable wire code, e.g. `NOT_FOUND`.
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION",
            Self::Conflict => "CONFLICT",
            Self::Database => "DATABASE",
            Self::Serialization => "SERIALIZATION",
            Self::Configuration => "CONFIGURATION",
            Self::ExternalService => "EXTERNAL_SERVICE",
            Self::Timeout => "TIMEOUT",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

type BoxedCause = Box<dyn std::error::Error + Send + Sync>;

/// A categorized failure with an optional underlying cause.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<BoxedCause>,
}

macro_rules! kind_constructors {
    ($($name:ident => $kind:ident),* $(,)?) => {
        $(
            #[doc = concat!("An error of kind [`ErrorKind::", stringify!($kind), "`].")]
            pub fn $name(message: impl Into<String>) -> Self {
                Self::new(ErrorKind::$kind, message)
            }
        )*
    };
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Like [`AppError::new`], keeping `cause` reachable through
    /// [`std::error::Error::source`].
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            source: Some(Box::new(cause)),
            ..Self::new(kind, message)
        }
    }

    kind_constructors! {
        not_found => NotFound,
        validation => Validation,
        conflict => Conflict,
        database => Database,
        configuration => Configuration,
        external_service => ExternalService,
        timeout => Timeout,
        service_unavailable => ServiceUnavailable,
        internal => Internal,
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::NotFound)
    }
}

// The cause is not `Clone`; a cloned error keeps kind and message only.
impl Clone for AppError {
    fn clone(&self) -> Self {
        Self::new(self.kind, self.message.clone())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        let message = format!("invalid JSON payload: {err}");
        Self::with_source(ErrorKind::Serialization, message, err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        let message = format!("configuration rejected: {err}");
        Self::with_source(ErrorKind::Configuration, message, err)
    }
}
