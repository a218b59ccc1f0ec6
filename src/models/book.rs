//! Book model and related types

use chrono::{DateTime, Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

static ISBN_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9-]+$").expect("valid ISBN pattern"));

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub year: i32,
    pub isbn: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Book reference expanded to its title
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BookTitle {
    pub id: Uuid,
    pub title: String,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(custom(function = "validate_year"))]
    pub year: i32,
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: String,
}

/// Update book request; only the fields present are validated and written
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: Option<String>,
    #[validate(custom(function = "validate_year"))]
    pub year: Option<i32>,
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: Option<String>,
}

/// Book list query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct BookQuery {
    /// Page number (default: 1)
    pub page: Option<String>,
    /// Books per page (default: 10)
    pub limit: Option<String>,
    /// Matches title, author or ISBN
    pub search: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    /// Exact ISBN
    pub isbn: Option<String>,
}

/// Conditions applied when counting and listing books
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFilter {
    pub search: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
}

impl From<&BookQuery> for BookFilter {
    fn from(query: &BookQuery) -> Self {
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        Self {
            search: non_empty(&query.search),
            title: non_empty(&query.title),
            author: non_empty(&query.author),
            isbn: non_empty(&query.isbn),
        }
    }
}

fn validate_year(year: i32) -> Result<(), ValidationError> {
    let current = Utc::now().year();
    if (1000..=current).contains(&year) {
        Ok(())
    } else {
        let mut error = ValidationError::new("year_range");
        error.message = Some(format!("Year must be between 1000 and {}", current).into());
        Err(error)
    }
}

/// ISBN-10 or ISBN-13: digits and hyphens only, with 10 or 13 digits
fn validate_isbn(isbn: &str) -> Result<(), ValidationError> {
    let digits = isbn.chars().filter(char::is_ascii_digit).count();
    if ISBN_CHARS.is_match(isbn) && (digits == 10 || digits == 13) {
        Ok(())
    } else {
        let mut error = ValidationError::new("isbn");
        error.message =
            Some("ISBN must be a valid ISBN-10 or ISBN-13, e.g. 123-4-56789-123-4".into());
        Err(error)
    }
}
