//! Error taxonomy: the closed set of error kinds and their response defaults

use std::fmt;
use std::str::FromStr;

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Category of application-level fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "ValidationError")]
    Validation,
    #[serde(rename = "NotFoundError")]
    NotFound,
    #[serde(rename = "DuplicateKeyError")]
    DuplicateKey,
    #[serde(rename = "UnauthorizedError")]
    Unauthorized,
    #[serde(rename = "ForbiddenError")]
    Forbidden,
    #[serde(rename = "InternalServerError")]
    InternalServer,
}

/// Status code and message registered for a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDefaults {
    pub status: StatusCode,
    pub message: &'static str,
}

/// Returned when a kind name does not belong to the taxonomy
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unregistered error kind: {0}")]
pub struct UnknownErrorKind(pub String);

impl ErrorKind {
    /// Every registered kind, in table order
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::Validation,
        ErrorKind::NotFound,
        ErrorKind::DuplicateKey,
        ErrorKind::Unauthorized,
        ErrorKind::Forbidden,
        ErrorKind::InternalServer,
    ];

    /// Look up the registered defaults for this kind
    pub const fn defaults(self) -> KindDefaults {
        match self {
            ErrorKind::Validation => KindDefaults {
                status: StatusCode::BAD_REQUEST,
                message: "Validation Error",
            },
            ErrorKind::NotFound => KindDefaults {
                status: StatusCode::NOT_FOUND,
                message: "Resource Not Found",
            },
            ErrorKind::DuplicateKey => KindDefaults {
                status: StatusCode::CONFLICT,
                message: "Duplicate Key Error",
            },
            ErrorKind::Unauthorized => KindDefaults {
                status: StatusCode::UNAUTHORIZED,
                message: "Unauthorized",
            },
            ErrorKind::Forbidden => KindDefaults {
                status: StatusCode::FORBIDDEN,
                message: "Forbidden",
            },
            ErrorKind::InternalServer => KindDefaults {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Internal Server Error",
            },
        }
    }

    pub const fn status(self) -> StatusCode {
        self.defaults().status
    }

    pub const fn default_message(self) -> &'static str {
        self.defaults().message
    }

    pub const fn name(self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::DuplicateKey => "DuplicateKeyError",
            ErrorKind::Unauthorized => "UnauthorizedError",
            ErrorKind::Forbidden => "ForbiddenError",
            ErrorKind::InternalServer => "InternalServerError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ErrorKind {
    type Err = UnknownErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownErrorKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_table() {
        let expected = [
            (ErrorKind::Validation, 400, "Validation Error"),
            (ErrorKind::NotFound, 404, "Resource Not Found"),
            (ErrorKind::DuplicateKey, 409, "Duplicate Key Error"),
            (ErrorKind::Unauthorized, 401, "Unauthorized"),
            (ErrorKind::Forbidden, 403, "Forbidden"),
            (ErrorKind::InternalServer, 500, "Internal Server Error"),
        ];

        for (kind, status, message) in expected {
            assert_eq!(kind.status().as_u16(), status, "{kind}");
            assert_eq!(kind.default_message(), message, "{kind}");
        }
    }

    #[test]
    fn names_parse_back() {
        for kind in ErrorKind::ALL {
            assert_eq!(kind.name().parse::<ErrorKind>(), Ok(kind));
        }
    }

    #[test]
    fn unregistered_name_is_rejected() {
        assert_eq!(
            "TeapotError".parse::<ErrorKind>(),
            Err(UnknownErrorKind("TeapotError".to_string()))
        );
    }
}
