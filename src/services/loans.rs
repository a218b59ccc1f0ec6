//! Loan management service

use uuid::Uuid;

use crate::{
    config::PaginationConfig,
    error::{ApiError, AppError, AppResult},
    models::{
        dates,
        loan::{CreateLoan, Loan, LoanFilter, LoanQuery, LoanRecord, LoanRelation, UpdateLoan},
    },
    pagination::{paginate, Page, PageRequest},
    repository::{parse_id, Repository},
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    pagination: PaginationConfig,
}

fn loan_not_found() -> AppError {
    ApiError::not_found("Loan not found").into()
}

/// Build the storage filter from raw query values
pub fn loan_filter(query: &LoanQuery) -> AppResult<LoanFilter> {
    fn present(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|value| !value.is_empty())
    }

    let date = |name: &str, value: &Option<String>| match present(value) {
        Some(raw) => dates::parse(raw)
            .map(Some)
            .ok_or_else(|| AppError::from(ApiError::validation(format!("Invalid date for {}", name)))),
        None => Ok(None),
    };

    Ok(LoanFilter {
        user_id: present(&query.user_id).map(parse_id).transpose()?,
        book_id: present(&query.book_id).map(parse_id).transpose()?,
        borrowed_from: date("borrowedFrom", &query.borrowed_from)?,
        borrowed_to: date("borrowedTo", &query.borrowed_to)?,
        due_from: date("dueFrom", &query.due_from)?,
        due_to: date("dueTo", &query.due_to)?,
    })
}

impl LoansService {
    pub fn new(repository: Repository, pagination: PaginationConfig) -> Self {
        Self {
            repository,
            pagination,
        }
    }

    /// List loans with borrower names and book titles resolved
    pub async fn list(&self, query: &LoanQuery) -> AppResult<Page<LoanRecord>> {
        let request = PageRequest::from_query(
            query.page.as_deref(),
            query.limit.as_deref(),
            self.pagination.default_limit,
            self.pagination.max_limit,
        );
        let filter = loan_filter(query)?;

        paginate(&self.repository.loans, &filter, request, &LoanRelation::ALL).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<LoanRecord> {
        self.repository
            .loans
            .get_record(id, &LoanRelation::ALL)
            .await?
            .ok_or_else(loan_not_found)
    }

    pub async fn create(&self, loan: CreateLoan) -> AppResult<Loan> {
        let loan = self.repository.loans.create(&loan).await?;
        tracing::info!(loan_id = %loan.id, book_id = %loan.book_id, user_id = %loan.user_id, "Loan created");
        Ok(loan)
    }

    pub async fn update(&self, id: Uuid, update: UpdateLoan) -> AppResult<Loan> {
        let loan = self
            .repository
            .loans
            .update(id, &update)
            .await?
            .ok_or_else(loan_not_found)?;

        if loan.return_date < loan.borrow_date {
            tracing::warn!(loan_id = %loan.id, "Loan due date precedes its borrow date");
        }
        Ok(loan)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.repository.loans.delete(id).await? {
            return Err(loan_not_found());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{classify, ErrorKind};
    use chrono::{TimeZone, Utc};

    #[test]
    fn filter_parses_ids_and_dates() {
        let user_id = Uuid::new_v4();
        let query = LoanQuery {
            user_id: Some(user_id.to_string()),
            borrowed_from: Some("2024-03-01".to_string()),
            due_to: Some(" ".to_string()),
            ..Default::default()
        };

        let filter = loan_filter(&query).unwrap();
        assert_eq!(filter.user_id, Some(user_id));
        assert_eq!(
            filter.borrowed_from,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(filter.due_to, None);
    }

    #[test]
    fn malformed_user_id_is_not_found() {
        let query = LoanQuery {
            user_id: Some("42".to_string()),
            ..Default::default()
        };
        let err = loan_filter(&query).unwrap_err();
        assert_eq!(classify(&err).kind(), ErrorKind::NotFound);
    }

    #[test]
    fn bad_date_is_a_validation_error() {
        let query = LoanQuery {
            due_from: Some("next week".to_string()),
            ..Default::default()
        };
        let error = classify(&loan_filter(&query).unwrap_err());
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.message(), "Invalid date for dueFrom");
    }
}
