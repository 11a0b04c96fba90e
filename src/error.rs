//! Error types for the book library

use std::fmt;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Numeric error codes returned in API error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 2,
    NoSuchBook = 3,
    BadValue = 4,
    NotPersisted = 5,
}

/// Kind of constraint a record broke at commit time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Missing or `null`
    Required,
    /// Another record already uses this value
    Unique,
    /// Text longer than the column allows
    Length,
    /// Value of the wrong type (e.g. a non-integer year)
    Type,
    /// Rejected by a storage-level check
    Check,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViolationKind::Required => "is required",
            ViolationKind::Unique => "must be unique",
            ViolationKind::Length => "is too long",
            ViolationKind::Type => "has the wrong type",
            ViolationKind::Check => "was rejected by the store",
        };
        f.write_str(s)
    }
}

/// One violated constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Violation {
    pub field: String,
    pub kind: ViolationKind,
}

impl Violation {
    pub fn new(field: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

/// All constraints violated by a rejected commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn single(field: impl Into<String>, kind: ViolationKind) -> Self {
        Self(vec![Violation::new(field, kind)])
    }

    pub fn push(&mut self, violation: Violation) {
        if !self.0.contains(&violation) {
            self.0.push(violation);
        }
    }

    /// Fold validator errors in, ordered by field name.
    ///
    /// Error code `length` maps to [`ViolationKind::Length`]; every other code
    /// is a type violation.
    pub fn extend_from_validation(&mut self, errors: &validator::ValidationErrors) {
        let mut fields: Vec<_> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| (field.to_string(), errs))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        for (field, errs) in fields {
            for err in errs {
                let kind = match &*err.code {
                    "length" => ViolationKind::Length,
                    _ => ViolationKind::Type,
                };
                self.push(Violation::new(field.clone(), kind));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, field: &str, kind: ViolationKind) -> bool {
        self.0.iter().any(|v| v.field == field && v.kind == kind)
    }

    pub fn into_vec(self) -> Vec<Violation> {
        self.0
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} {}", v.field, v.kind)?;
        }
        Ok(())
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Book has not been persisted yet")]
    NotPersisted,

    /// Commit rejected; nothing from the batch was written
    #[error("Commit failed: {0}")]
    Constraint(Violations),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<Violations> for AppError {
    fn from(violations: Violations) -> Self {
        AppError::Constraint(violations)
    }
}

/// Error response body
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut violations = Vec::new();
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook, msg),
            AppError::NotPersisted => (
                StatusCode::BAD_REQUEST,
                ErrorCode::NotPersisted,
                "Book has not been persisted yet".to_string(),
            ),
            AppError::Constraint(v) => {
                let message = format!("Commit failed: {}", v);
                violations = v.into_vec();
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, message)
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
            violations,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
