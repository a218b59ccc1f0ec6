//! Book catalog service

use uuid::Uuid;

use crate::{
    config::PaginationConfig,
    error::{ApiError, AppError, AppResult},
    models::book::{Book, BookFilter, BookQuery, CreateBook, UpdateBook},
    pagination::{paginate, Page, PageRequest},
    repository::Repository,
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
    pagination: PaginationConfig,
}

/// Duplicate ISBNs are reported on the field rather than through the generic
/// unique-violation message
fn isbn_conflict(err: AppError) -> AppError {
    if err.is_unique_violation() {
        ApiError::validation("ISBN must be unique.").into()
    } else {
        err
    }
}

fn book_not_found() -> AppError {
    ApiError::not_found("Book not found").into()
}

impl BooksService {
    pub fn new(repository: Repository, pagination: PaginationConfig) -> Self {
        Self {
            repository,
            pagination,
        }
    }

    /// List books matching the query, one page at a time
    pub async fn list(&self, query: &BookQuery) -> AppResult<Page<Book>> {
        let request = PageRequest::from_query(
            query.page.as_deref(),
            query.limit.as_deref(),
            self.pagination.default_limit,
            self.pagination.max_limit,
        );
        let filter = BookFilter::from(query);

        paginate(&self.repository.books, &filter, request, &[]).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Book> {
        self.repository
            .books
            .get_by_id(id)
            .await?
            .ok_or_else(book_not_found)
    }

    pub async fn create(&self, book: CreateBook) -> AppResult<Book> {
        let book = self.repository.books.create(&book).await.map_err(isbn_conflict)?;
        tracing::info!(book_id = %book.id, isbn = %book.isbn, "Book created");
        Ok(book)
    }

    pub async fn update(&self, id: Uuid, update: UpdateBook) -> AppResult<Book> {
        self.repository
            .books
            .update(id, &update)
            .await
            .map_err(isbn_conflict)?
            .ok_or_else(book_not_found)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.repository.books.delete(id).await? {
            return Err(book_not_found());
        }
        tracing::info!(book_id = %id, "Book deleted");
        Ok(())
    }
}
