//! User model, authentication payloads and JWT claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// User model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Argon2 hash; never sent to clients
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User reference expanded to its name
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UserName {
    pub id: Uuid,
    pub name: String,
}

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Email must be a valid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Email must be a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Update own profile request; at least one field is required
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_profile_not_empty"))]
pub struct UpdateProfile {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(email(message = "Email must be a valid email"))]
    pub email: Option<String>,
}

fn validate_profile_not_empty(profile: &UpdateProfile) -> Result<(), ValidationError> {
    if profile.name.is_none() && profile.email.is_none() {
        let mut error = ValidationError::new("empty_update");
        error.message = Some("At least one of name or email must be provided".into());
        return Err(error);
    }
    Ok(())
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl UserClaims {
    pub fn new(user_id: Uuid, expiration_hours: u64) -> Self {
        let iat = Utc::now().timestamp();
        let lifetime = i64::try_from(expiration_hours.saturating_mul(3600)).unwrap_or(i64::MAX);
        Self {
            user_id,
            iat,
            exp: iat.saturating_add(lifetime),
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trip() {
        let claims = UserClaims::new(Uuid::new_v4(), 1);
        let token = claims.create_token(SECRET).unwrap();
        assert_eq!(UserClaims::from_token(&token, SECRET).unwrap(), claims);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let claims = UserClaims {
            user_id: Uuid::new_v4(),
            iat: 1_000,
            exp: 2_000,
        };
        let token = claims.create_token(SECRET).unwrap();
        let err = UserClaims::from_token(&token, SECRET).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = UserClaims::new(Uuid::new_v4(), 1).create_token(SECRET).unwrap();
        let err = UserClaims::from_token(&token, "other-secret").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidSignature));
    }

    #[test]
    fn claims_use_user_id_key() {
        let claims = UserClaims::new(Uuid::nil(), 1);
        let value = serde_json::to_value(&claims).unwrap();
        assert!(value.get("userId").is_some());
    }

    #[test]
    fn profile_update_needs_a_field() {
        assert!(UpdateProfile::default().validate().is_err());

        let update = UpdateProfile {
            email: Some("new@example.com".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());

        let update = UpdateProfile {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn registration_rules() {
        let user = RegisterUser {
            name: "Omar Ali".to_string(),
            email: "omar.ali@example.com".to_string(),
            password: "pass".to_string(),
        };
        let errors = user.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }
}
