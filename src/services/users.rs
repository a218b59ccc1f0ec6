//! Registration, authentication and profile service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    error::{ApiError, AppError, AppResult},
    models::user::{LoginRequest, RegisterUser, UpdateProfile, User, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

fn invalid_credentials() -> AppError {
    ApiError::unauthorized("Invalid credentials.").into()
}

fn user_not_found() -> AppError {
    ApiError::not_found("User not found.").into()
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new account and sign a token for it
    pub async fn register(&self, request: RegisterUser) -> AppResult<String> {
        if self
            .repository
            .users
            .get_by_email(&request.email)
            .await?
            .is_some()
        {
            return Err(ApiError::validation("Email is already in use.").into());
        }

        let password_hash = hash_password(&request.password)?;
        let user = self
            .repository
            .users
            .create(&request.name, &request.email, &password_hash)
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        self.issue_token(user.id)
    }

    /// Authenticate by email and password
    pub async fn login(&self, request: LoginRequest) -> AppResult<String> {
        let user = self
            .repository
            .users
            .get_by_email(&request.email)
            .await?
            .ok_or_else(invalid_credentials)?;

        if !verify_password(&request.password, &user.password)? {
            tracing::debug!(user_id = %user.id, "Rejected login with wrong password");
            return Err(invalid_credentials());
        }

        self.issue_token(user.id)
    }

    /// Decode a bearer token into its claims
    pub fn verify_token(&self, token: &str) -> AppResult<UserClaims> {
        Ok(UserClaims::from_token(token, &self.config.jwt_secret)?)
    }

    pub async fn profile(&self, user_id: Uuid) -> AppResult<User> {
        self.repository
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(user_not_found)
    }

    pub async fn update_profile(&self, user_id: Uuid, profile: UpdateProfile) -> AppResult<User> {
        self.repository
            .users
            .update_profile(user_id, &profile)
            .await?
            .ok_or_else(user_not_found)
    }

    fn issue_token(&self, user_id: Uuid) -> AppResult<String> {
        UserClaims::new(user_id, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }
}
