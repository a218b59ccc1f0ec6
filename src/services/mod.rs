//! Business logic services

pub mod books;
pub mod loans;
pub mod users;

use crate::{
    config::{AuthConfig, PaginationConfig},
    error::AppResult,
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub books: books::BooksService,
    pub loans: loans::LoansService,
    pub users: users::UsersService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig, pagination: PaginationConfig) -> Self {
        Self {
            books: books::BooksService::new(repository.clone(), pagination.clone()),
            loans: loans::LoansService::new(repository.clone(), pagination),
            users: users::UsersService::new(repository.clone(), auth_config),
            repository,
        }
    }

    /// Check that the database answers
    pub async fn ready(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
