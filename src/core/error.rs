use std::fmt;

use http::{Method, StatusCode};
use thiserror::Error;

/// Which allow-list rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Header,
    Param,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::Header => f.write_str("header"),
            ConstraintKind::Param => f.write_str("parameter"),
        }
    }
}

/// Why a request ended in 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// No mapping and convention mode is off.
    NoMapping,
    /// The path hit a deny prefix or missed every allow prefix.
    PathDenied,
    /// Convention resolution ran but produced no view.
    NoView,
    /// The matched handler returned no view.
    EmptyResult,
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NotFoundReason::NoMapping => "no mapping",
            NotFoundReason::PathDenied => "convention path denied",
            NotFoundReason::NoView => "no convention view",
            NotFoundReason::EmptyResult => "handler produced no view",
        };
        f.write_str(text)
    }
}

/// Terminal failure of a single dispatch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("{kind} constraint failed: {name}")]
    Validation { kind: ConstraintKind, name: String },

    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },

    #[error("not found: {path} ({reason})")]
    NotFound {
        path: String,
        reason: NotFoundReason,
    },

    #[error("malformed request path: {path}")]
    MalformedPath { path: String },

    #[error("internal dispatch error: {0}")]
    Internal(String),
}

impl DispatchError {
    pub fn not_found(path: &str, reason: NotFoundReason) -> Self {
        DispatchError::NotFound {
            path: path.to_string(),
            reason,
        }
    }

    /// HTTP status the error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::Validation { .. } => StatusCode::BAD_REQUEST,
            DispatchError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::NotFound { .. } => StatusCode::NOT_FOUND,
            DispatchError::MalformedPath { .. } => StatusCode::BAD_REQUEST,
            DispatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DispatchError::Validation { .. } => "validation",
            DispatchError::MethodNotAllowed { .. } => "method_not_allowed",
            DispatchError::NotFound { .. } => "not_found",
            DispatchError::MalformedPath { .. } => "malformed_path",
            DispatchError::Internal(_) => "internal",
        }
    }
}

/// Errors raised while assembling a dispatcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistrationError {
    #[error("route already registered: {path}")]
    DuplicateRoute { path: String },

    #[error("invalid route path '{path}': must start with '/'")]
    InvalidPath { path: String },

    #[error("unknown HTTP method '{method}' on route {path}")]
    InvalidMethod { path: String, method: String },

    #[error("extension '{suffix}' listed more than once")]
    DuplicateExtension { suffix: String },

    #[error("unknown view extension '{suffix}'")]
    UnknownExtension { suffix: String },

    #[error("invalid view action: {message}")]
    InvalidAction { message: String },

    #[error("url parameter separator must be a single character, got '{separator}'")]
    InvalidSeparator { separator: String },
}
