//! Books repository for database operations

use std::convert::Infallible;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{contains_pattern, to_bigint};
use crate::{
    error::AppResult,
    models::book::{Book, BookFilter, CreateBook, UpdateBook},
    pagination::{Collection, FindOptions},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(book)
    }

    /// Create a new book
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, year, isbn)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.year)
        .bind(&book.isbn)
        .fetch_one(&self.pool)
        .await?;

        Ok(book)
    }

    /// Update the fields present in `update`; `None` if the book does not exist
    pub async fn update(&self, id: Uuid, update: &UpdateBook) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                year = COALESCE($4, year),
                isbn = COALESCE($5, isbn),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.title)
        .bind(&update.author)
        .bind(update.year)
        .bind(&update.isbn)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    /// Delete a book and, through the foreign key, its loans
    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Append the WHERE clause for `filter`
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &BookFilter) {
    let mut separator = " WHERE ";

    if let Some(search) = &filter.search {
        let pattern = contains_pattern(search);
        builder
            .push(separator)
            .push("(title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR author ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR isbn ILIKE ")
            .push_bind(pattern)
            .push(")");
        separator = " AND ";
    }

    if let Some(title) = &filter.title {
        builder
            .push(separator)
            .push("title ILIKE ")
            .push_bind(contains_pattern(title));
        separator = " AND ";
    }

    if let Some(author) = &filter.author {
        builder
            .push(separator)
            .push("author ILIKE ")
            .push_bind(contains_pattern(author));
        separator = " AND ";
    }

    if let Some(isbn) = &filter.isbn {
        builder.push(separator).push("isbn = ").push_bind(isbn.clone());
    }
}

#[async_trait]
impl Collection for BooksRepository {
    type Record = Book;
    type Filter = BookFilter;
    type Relation = Infallible;

    async fn count(&self, filter: &BookFilter) -> AppResult<u64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM books");
        push_filter(&mut builder, filter);

        let total: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn find(
        &self,
        filter: &BookFilter,
        options: FindOptions<Infallible>,
    ) -> AppResult<Vec<Book>> {
        let mut builder = QueryBuilder::new("SELECT * FROM books");
        push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY created_at, id LIMIT ")
            .push_bind(to_bigint(options.limit))
            .push(" OFFSET ")
            .push_bind(to_bigint(options.skip));

        let books = builder.build_query_as::<Book>().fetch_all(&self.pool).await?;
        Ok(books)
    }
}
