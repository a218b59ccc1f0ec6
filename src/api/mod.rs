//! API handlers for the library REST endpoints

pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod users;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, OriginalUri, Query, Request},
    http::{header::AUTHORIZATION, request::Parts, Method, StatusCode, Uri},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{panic_response, ApiError, AppError},
    models::user::UserClaims,
    pagination::Page,
    AppState,
};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(bearer_token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::unauthorized("No token, authorization denied."))?;

        let claims = state.services.users.verify_token(token)?;
        Ok(AuthenticatedUser(claims))
    }
}

/// Accept both `Bearer <token>` and the bare token
fn bearer_token(header: &str) -> &str {
    let header = header.trim();
    match header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ if header.eq_ignore_ascii_case("bearer") => "",
        _ => header,
    }
}

/// JSON body that has been decoded and checked against its validation rules
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Query string extractor whose failures use the error envelope
pub struct ListQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ListQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ListQuery(value))
    }
}

/// Success envelope around a single resource
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Data<T> {
    pub fn new(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// Success envelope around one page of a listing
#[derive(Debug, Serialize)]
pub struct Listing<T> {
    pub success: bool,
    #[serde(flatten)]
    pub page: Page<T>,
}

impl<T> Listing<T> {
    pub fn new(page: Page<T>) -> Json<Self> {
        Json(Self {
            success: true,
            page,
        })
    }
}

/// Authentication response
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub success: bool,
    /// Signed JWT carrying the user id
    pub token: String,
}

async fn route_not_found(uri: Uri) -> AppError {
    ApiError::not_found(format!("Route not found: {}", uri.path())).into()
}

async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    ApiError::not_found(format!("Method {} not allowed on {}", method, uri.path()))
        .with_status(StatusCode::METHOD_NOT_ALLOWED)
        .into()
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Books
        .route(
            "/books",
            get(books::list_books)
                .post(books::create_book)
                .fallback(method_not_allowed),
        )
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book)
                .fallback(method_not_allowed),
        )
        // Loans
        .route(
            "/loans",
            get(loans::list_loans)
                .post(loans::create_loan)
                .fallback(method_not_allowed),
        )
        .route(
            "/loans/:id",
            get(loans::get_loan)
                .put(loans::update_loan)
                .delete(loans::delete_loan)
                .fallback(method_not_allowed),
        )
        // Users
        .route(
            "/users/register",
            post(users::register).fallback(method_not_allowed),
        )
        .route(
            "/users/login",
            post(users::login).fallback(method_not_allowed),
        )
        .route(
            "/users/profile",
            get(users::get_profile)
                .put(users::update_profile)
                .fallback(method_not_allowed),
        );

    Router::new()
        .route(
            "/health",
            get(health::health_check).fallback(method_not_allowed),
        )
        .route(
            "/ready",
            get(health::readiness_check).fallback(method_not_allowed),
        )
        .nest("/api", api)
        .with_state(state)
        .merge(openapi::create_openapi_router())
        .fallback(route_not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    use crate::{config::AppConfig, models::user::UserClaims, repository::Repository, services::Services, AppState};

    /// State over a pool that never connects unless a query runs
    pub fn state() -> AppState {
        let config = AppConfig::default();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database.url)
            .expect("lazy pool");
        let services = Services::new(
            Repository::new(pool),
            config.auth.clone(),
            config.pagination.clone(),
        );

        AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }

    pub fn token(state: &AppState) -> String {
        UserClaims::new(Uuid::new_v4(), 1)
            .create_token(&state.config.auth.jwt_secret)
            .unwrap()
    }

    pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    pub async fn read(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}
