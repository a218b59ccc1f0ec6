//! Maps every fault raised while handling a request to the error envelope

use std::any::Any;
use std::collections::BTreeMap;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::errors::ErrorKind as TokenErrorKind;
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value;

use super::{ApiError, AppError, Details, ErrorKind, SchemaFault, StorageFault};

static DIAGNOSTICS: OnceCell<bool> = OnceCell::new();

/// Choose once, at startup, whether internal error detail is written to the log.
pub fn enable_diagnostics(enabled: bool) {
    if DIAGNOSTICS.set(enabled).is_err() {
        tracing::warn!("Error diagnostics already configured, ignoring new setting");
    }
}

fn diagnostics_enabled() -> bool {
    DIAGNOSTICS.get().copied().unwrap_or(true)
}

/// Error response body
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[schema(value_type = Object)]
    pub details: Details,
}

/// Classify a fault into exactly one taxonomy kind.
///
/// Arms are tried in order: application errors pass through untouched, then
/// schema validation, malformed identifiers, unique violations and token
/// faults are reclassified; everything else is an internal error.
pub fn classify(fault: &AppError) -> ApiError {
    match fault {
        AppError::Api(error) => error.clone(),
        AppError::Schema(schema) => schema_error(schema),
        AppError::Storage(StorageFault::MalformedId { value }) => {
            ApiError::not_found(format!("Resource not found with id: {}", value))
        }
        AppError::Storage(StorageFault::UniqueViolation { field }) => ApiError::validation(
            format!("Duplicate value entered for {}. It must be unique.", field),
        ),
        AppError::Storage(StorageFault::MissingReference { field }) => {
            ApiError::validation(format!("Referenced {} does not exist.", field))
        }
        AppError::Token(error) => match error.kind() {
            TokenErrorKind::ExpiredSignature => ApiError::unauthorized("Token expired."),
            _ => ApiError::unauthorized("Invalid token."),
        },
        AppError::Storage(StorageFault::Driver(_)) | AppError::Internal(_) => {
            ApiError::new(ErrorKind::InternalServer)
        }
    }
}

fn schema_error(fault: &SchemaFault) -> ApiError {
    match fault {
        SchemaFault::Shape(detail) => ApiError::validation(detail.clone()),
        SchemaFault::Fields(errors) => {
            let fields: BTreeMap<String, Vec<String>> = errors
                .field_errors()
                .into_iter()
                .map(|(field, errors)| {
                    let field = field.to_string();
                    let messages = errors
                        .iter()
                        .map(|error| match &error.message {
                            Some(message) => message.to_string(),
                            None => format!("{} is invalid ({})", field, error.code),
                        })
                        .collect();
                    (field, messages)
                })
                .collect();

            let message = fields
                .values()
                .flatten()
                .next()
                .cloned()
                .unwrap_or_else(|| ErrorKind::Validation.default_message().to_string());

            let mut details = Details::new();
            details.insert(
                "fields".to_string(),
                serde_json::to_value(&fields).unwrap_or(Value::Null),
            );

            ApiError::validation(message).with_details(details)
        }
    }
}

fn log_fault(fault: &AppError, error: &ApiError) {
    if error.status().is_server_error() {
        if diagnostics_enabled() {
            tracing::error!(error = %fault, "Request failed");
        } else {
            tracing::error!(kind = %error.kind(), "Request failed");
        }
    } else {
        tracing::debug!(kind = %error.kind(), message = error.message(), "Request rejected");
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error = classify(&self);
        log_fault(&self, &error);

        let status = error.status();
        let body = Json(ErrorResponse {
            success: false,
            message: error.message().to_string(),
            details: error.details().clone(),
        });

        (status, body).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        AppError::Api(self).into_response()
    }
}

/// Fallback response when a handler panics instead of returning an error
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");

    if diagnostics_enabled() {
        tracing::error!(panic = detail, "Request handler panicked");
    } else {
        tracing::error!("Request handler panicked");
    }

    let kind = ErrorKind::InternalServer;
    (
        kind.status(),
        Json(serde_json::json!({
            "success": false,
            "message": kind.default_message(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode};
    use serde_json::json;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
        password: String,
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn application_errors_pass_through() {
        let error = ApiError::not_found("Book not found");
        assert_eq!(classify(&AppError::Api(error.clone())), error);
    }

    #[test]
    fn field_errors_become_validation_error() {
        let errors = Sample {
            password: "abc".to_string(),
        }
        .validate()
        .unwrap_err();

        let error = classify(&AppError::from(errors));
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.message(), "Password must be at least 6 characters");
        assert_eq!(
            error.details().get("fields"),
            Some(&json!({ "password": ["Password must be at least 6 characters"] }))
        );
    }

    #[test]
    fn shape_errors_keep_detail_as_message() {
        let fault = AppError::Schema(SchemaFault::Shape("missing field `title`".to_string()));
        let error = classify(&fault);
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.message(), "missing field `title`");
    }

    #[test]
    fn malformed_id_is_not_found() {
        let error = classify(&AppError::malformed_id("not-an-id"));
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert!(error.message().contains("not-an-id"));
    }

    #[test]
    fn unique_violation_names_field() {
        let fault = AppError::Storage(StorageFault::UniqueViolation {
            field: "isbn".to_string(),
        });
        let error = classify(&fault);
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert!(error.message().contains("isbn"));
        assert!(error.message().contains("unique"));
    }

    #[test]
    fn missing_reference_is_validation_error() {
        let fault = AppError::Storage(StorageFault::MissingReference {
            field: "book".to_string(),
        });
        let error = classify(&fault);
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.message(), "Referenced book does not exist.");
    }

    #[test]
    fn diagnostics_setting_is_fixed_once() {
        enable_diagnostics(false);
        enable_diagnostics(true);
        assert!(!diagnostics_enabled());

        let fault = AppError::Internal("password authentication failed".to_string());
        let response = fault.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn token_faults_are_unauthorized() {
        let expired = AppError::from(jsonwebtoken::errors::Error::from(
            TokenErrorKind::ExpiredSignature,
        ));
        let invalid = AppError::from(jsonwebtoken::errors::Error::from(
            TokenErrorKind::InvalidSignature,
        ));

        let expired = classify(&expired);
        assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(expired.message(), "Token expired.");
        assert_eq!(classify(&invalid).message(), "Invalid token.");
    }

    #[test]
    fn unknown_faults_hide_detail() {
        let fault = AppError::Internal("connection refused on 10.0.0.3".to_string());
        let error = classify(&fault);
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message(), "Internal Server Error");

        let driver = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(classify(&driver).kind(), ErrorKind::InternalServer);
    }

    #[tokio::test]
    async fn envelope_shape() {
        let response = ApiError::validation("X").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "success": false, "message": "X", "details": {} })
        );
    }

    #[tokio::test]
    async fn every_kind_renders_its_status() {
        for kind in ErrorKind::ALL {
            let response = ApiError::new(kind).into_response();
            assert_eq!(response.status(), kind.status());
            let body = body_json(response).await;
            assert_eq!(body["message"], kind.default_message());
        }
    }

    #[tokio::test]
    async fn panic_fallback_is_bare_500() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "success": false, "message": "Internal Server Error" })
        );
    }
}
