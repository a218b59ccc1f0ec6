//! Loan model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{book::BookTitle, dates, user::UserName};

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    #[serde(rename = "book")]
    pub book_id: Uuid,
    pub borrow_date: DateTime<Utc>,
    /// Due date
    pub return_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored reference, either as its bare id or resolved inline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reference<T> {
    Id(Uuid),
    Expanded(T),
}

/// References a loan listing can resolve inline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanRelation {
    User,
    Book,
}

impl LoanRelation {
    pub const ALL: [LoanRelation; 2] = [LoanRelation::User, LoanRelation::Book];
}

/// Loan as returned by reads, with optionally expanded references
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRecord {
    pub id: Uuid,
    pub user: Reference<UserName>,
    pub book: Reference<BookTitle>,
    pub borrow_date: DateTime<Utc>,
    pub return_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Loan row joined with the optional expansion columns
#[derive(Debug, Clone, FromRow)]
pub struct LoanRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub borrow_date: DateTime<Utc>,
    pub return_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_name: Option<String>,
    pub book_title: Option<String>,
}

impl From<LoanRow> for LoanRecord {
    fn from(row: LoanRow) -> Self {
        let user = match row.user_name {
            Some(name) => Reference::Expanded(UserName {
                id: row.user_id,
                name,
            }),
            None => Reference::Id(row.user_id),
        };
        let book = match row.book_title {
            Some(title) => Reference::Expanded(BookTitle {
                id: row.book_id,
                title,
            }),
            None => Reference::Id(row.book_id),
        };

        Self {
            id: row.id,
            user,
            book,
            borrow_date: row.borrow_date,
            return_date: row.return_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Create loan request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_create_dates"))]
pub struct CreateLoan {
    /// Book id
    pub book: Uuid,
    /// User id
    pub user: Uuid,
    /// Defaults to now
    #[serde(default, deserialize_with = "dates::option::deserialize")]
    pub borrow_date: Option<DateTime<Utc>>,
    /// Due date
    #[serde(deserialize_with = "dates::deserialize")]
    pub return_date: DateTime<Utc>,
}

/// Update loan request; absent fields keep their stored value
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_update_dates"))]
pub struct UpdateLoan {
    pub book: Option<Uuid>,
    pub user: Option<Uuid>,
    #[serde(default, deserialize_with = "dates::option::deserialize")]
    pub borrow_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "dates::option::deserialize")]
    pub return_date: Option<DateTime<Utc>>,
}

fn dates_in_order(
    borrow_date: Option<DateTime<Utc>>,
    return_date: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
    match (borrow_date, return_date) {
        (Some(borrowed), Some(due)) if due < borrowed => {
            let mut error = ValidationError::new("date_order");
            error.message = Some("returnDate must not be before borrowDate".into());
            Err(error)
        }
        _ => Ok(()),
    }
}

fn validate_create_dates(loan: &CreateLoan) -> Result<(), ValidationError> {
    dates_in_order(loan.borrow_date, Some(loan.return_date))
}

fn validate_update_dates(loan: &UpdateLoan) -> Result<(), ValidationError> {
    dates_in_order(loan.borrow_date, loan.return_date)
}

/// Loan list query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct LoanQuery {
    /// Page number (default: 1)
    pub page: Option<String>,
    /// Loans per page (default: 10)
    pub limit: Option<String>,
    pub user_id: Option<String>,
    pub book_id: Option<String>,
    /// Borrowed on or after this date
    pub borrowed_from: Option<String>,
    /// Borrowed on or before this date
    pub borrowed_to: Option<String>,
    /// Due on or after this date
    pub due_from: Option<String>,
    /// Due on or before this date
    pub due_to: Option<String>,
}

/// Conditions applied when counting and listing loans
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanFilter {
    pub user_id: Option<Uuid>,
    pub book_id: Option<Uuid>,
    pub borrowed_from: Option<DateTime<Utc>>,
    pub borrowed_to: Option<DateTime<Utc>>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
}
