//! Error types for the library API
//!
//! Handlers return [`AppResult`]. The error side is an [`AppError`], a closed
//! set of fault shapes: application errors built from the taxonomy, schema
//! validation failures, storage driver faults and token faults. All of them
//! are turned into the same JSON envelope by [`classify`].

mod classify;
mod kind;

use std::fmt;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
};
use serde_json::{Map, Value};
use sqlx::{error::ErrorKind as DbErrorKind, postgres::PgDatabaseError};
use thiserror::Error;

pub use classify::{classify, enable_diagnostics, panic_response, ErrorResponse};
pub use kind::{ErrorKind, KindDefaults, UnknownErrorKind};

/// Structured payload attached to an error response
pub type Details = Map<String, Value>;

/// An application error: a taxonomy kind with its response status and message
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    kind: ErrorKind,
    status: StatusCode,
    message: String,
    details: Details,
}

impl ApiError {
    /// Build an error carrying the kind's registered status and message
    pub fn new(kind: ErrorKind) -> Self {
        let defaults = kind.defaults();
        Self {
            kind,
            status: defaults.status,
            message: defaults.message.to_string(),
            details: Details::new(),
        }
    }

    /// Build an error from caller overrides.
    ///
    /// A string `message` entry replaces the default message; every other
    /// entry becomes part of the details.
    pub fn with_overrides(kind: ErrorKind, mut overrides: Details) -> Self {
        let message = match overrides.remove("message") {
            Some(Value::String(message)) => Some(message),
            Some(other) => {
                overrides.insert("message".to_string(), other);
                None
            }
            None => None,
        };

        let error = Self::new(kind).with_details(overrides);
        match message {
            Some(message) => error.with_message(message),
            None => error,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation).with_message(message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound).with_message(message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized).with_message(message)
    }

    pub fn internal() -> Self {
        Self::new(ErrorKind::InternalServer)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_details(mut self, details: Details) -> Self {
        self.details = details;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &Details {
        &self.details
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Input rejected before reaching any handler logic
#[derive(Error, Debug)]
pub enum SchemaFault {
    /// Field-level rule violations
    #[error("{0}")]
    Fields(validator::ValidationErrors),
    /// Body or query that could not be decoded into the expected shape
    #[error("{0}")]
    Shape(String),
}

/// Storage driver faults, narrowed to the shapes the API distinguishes
#[derive(Error, Debug)]
pub enum StorageFault {
    #[error("Malformed identifier: {value}")]
    MalformedId { value: String },

    #[error("Unique constraint violated on {field}")]
    UniqueViolation { field: String },

    #[error("Referenced {field} does not exist")]
    MissingReference { field: String },

    #[error(transparent)]
    Driver(sqlx::Error),
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("Validation failed: {0}")]
    Schema(SchemaFault),

    #[error("Storage error: {0}")]
    Storage(StorageFault),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, AppError::Storage(StorageFault::UniqueViolation { .. }))
    }

    pub fn malformed_id(value: impl Into<String>) -> Self {
        AppError::Storage(StorageFault::MalformedId {
            value: value.into(),
        })
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Schema(SchemaFault::Fields(errors))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Schema(SchemaFault::Shape(rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Schema(SchemaFault::Shape(rejection.body_text()))
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AppError::Internal(format!("Password hashing failed: {}", err))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(StorageFault::from(err))
    }
}

impl From<sqlx::Error> for StorageFault {
    fn from(err: sqlx::Error) -> Self {
        let narrowed = match &err {
            sqlx::Error::Database(db_err) => {
                let pg = db_err.try_downcast_ref::<PgDatabaseError>();
                let detail = pg.and_then(|e| e.detail());

                match db_err.kind() {
                    DbErrorKind::UniqueViolation => Some(StorageFault::UniqueViolation {
                        field: unique_field(detail, db_err.constraint(), pg.and_then(|e| e.table())),
                    }),
                    DbErrorKind::ForeignKeyViolation => {
                        detail.and_then(key_column).map(|column| StorageFault::MissingReference {
                            field: column.strip_suffix("_id").unwrap_or(column).to_string(),
                        })
                    }
                    _ => None,
                }
            }
            _ => None,
        };

        narrowed.unwrap_or(StorageFault::Driver(err))
    }
}

/// Extract the column list from a detail such as `Key (isbn)=(123) already exists.`
fn key_column(detail: &str) -> Option<&str> {
    detail
        .strip_prefix("Key (")
        .and_then(|rest| rest.split_once(")="))
        .map(|(column, _)| column)
}

/// Name the field behind a unique violation, preferring the driver's detail
/// line and falling back to the `<table>_<field>_key` constraint naming.
fn unique_field(detail: Option<&str>, constraint: Option<&str>, table: Option<&str>) -> String {
    if let Some(column) = detail.and_then(key_column) {
        return column.to_string();
    }

    let Some(constraint) = constraint else {
        return "field".to_string();
    };
    let trimmed = constraint.strip_suffix("_key").unwrap_or(constraint);
    table
        .and_then(|table| trimmed.strip_prefix(table))
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or(trimmed)
        .to_string()
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
