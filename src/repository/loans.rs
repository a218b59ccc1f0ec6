//! Loans repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::to_bigint;
use crate::{
    error::AppResult,
    models::loan::{CreateLoan, Loan, LoanFilter, LoanRecord, LoanRelation, LoanRow, UpdateLoan},
    pagination::{Collection, FindOptions},
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a loan with the requested references resolved
    pub async fn get_record(
        &self,
        id: Uuid,
        expand: &[LoanRelation],
    ) -> AppResult<Option<LoanRecord>> {
        let mut builder = select_loans(expand);
        builder.push(" WHERE l.id = ").push_bind(id);

        let row = builder
            .build_query_as::<LoanRow>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(LoanRecord::from))
    }

    /// Create a new loan; the borrow date defaults to now
    pub async fn create(&self, loan: &CreateLoan) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (user_id, book_id, borrow_date, return_date)
            VALUES ($1, $2, COALESCE($3, NOW()), $4)
            RETURNING *
            "#,
        )
        .bind(loan.user)
        .bind(loan.book)
        .bind(loan.borrow_date)
        .bind(loan.return_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(loan)
    }

    /// Update the fields present in `update`; `None` if the loan does not exist
    pub async fn update(&self, id: Uuid, update: &UpdateLoan) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET
                user_id = COALESCE($2, user_id),
                book_id = COALESCE($3, book_id),
                borrow_date = COALESCE($4, borrow_date),
                return_date = COALESCE($5, return_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.user)
        .bind(update.book)
        .bind(update.borrow_date)
        .bind(update.return_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(loan)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// SELECT over loans, joining users and books only for the requested relations
fn select_loans(expand: &[LoanRelation]) -> QueryBuilder<'static, Postgres> {
    let user = expand.contains(&LoanRelation::User);
    let book = expand.contains(&LoanRelation::Book);

    let mut builder = QueryBuilder::new(
        "SELECT l.id, l.user_id, l.book_id, l.borrow_date, l.return_date, l.created_at, l.updated_at",
    );
    builder.push(if user {
        ", u.name AS user_name"
    } else {
        ", NULL::TEXT AS user_name"
    });
    builder.push(if book {
        ", b.title AS book_title"
    } else {
        ", NULL::TEXT AS book_title"
    });
    builder.push(" FROM loans l");
    if user {
        builder.push(" LEFT JOIN users u ON u.id = l.user_id");
    }
    if book {
        builder.push(" LEFT JOIN books b ON b.id = l.book_id");
    }
    builder
}

/// Append the WHERE clause for `filter`
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &LoanFilter) {
    let mut separated = false;

    if let Some(user_id) = filter.user_id {
        push_condition(builder, &mut separated, "l.user_id = ");
        builder.push_bind(user_id);
    }
    if let Some(book_id) = filter.book_id {
        push_condition(builder, &mut separated, "l.book_id = ");
        builder.push_bind(book_id);
    }
    if let Some(from) = filter.borrowed_from {
        push_condition(builder, &mut separated, "l.borrow_date >= ");
        builder.push_bind(from);
    }
    if let Some(to) = filter.borrowed_to {
        push_condition(builder, &mut separated, "l.borrow_date <= ");
        builder.push_bind(to);
    }
    if let Some(from) = filter.due_from {
        push_condition(builder, &mut separated, "l.return_date >= ");
        builder.push_bind(from);
    }
    if let Some(to) = filter.due_to {
        push_condition(builder, &mut separated, "l.return_date <= ");
        builder.push_bind(to);
    }
}

fn push_condition(builder: &mut QueryBuilder<'_, Postgres>, separated: &mut bool, sql: &str) {
    builder.push(if *separated { " AND " } else { " WHERE " });
    builder.push(sql);
    *separated = true;
}

#[async_trait]
impl Collection for LoansRepository {
    type Record = LoanRecord;
    type Filter = LoanFilter;
    type Relation = LoanRelation;

    async fn count(&self, filter: &LoanFilter) -> AppResult<u64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM loans l");
        push_filter(&mut builder, filter);

        let total: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn find(
        &self,
        filter: &LoanFilter,
        options: FindOptions<LoanRelation>,
    ) -> AppResult<Vec<LoanRecord>> {
        let mut builder = select_loans(&options.expand);
        push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY l.created_at, l.id LIMIT ")
            .push_bind(to_bigint(options.limit))
            .push(" OFFSET ")
            .push_bind(to_bigint(options.skip));

        let rows = builder
            .build_query_as::<LoanRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(LoanRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn joins_follow_expand() {
        let sql = select_loans(&[]).into_sql();
        assert!(!sql.contains("JOIN"));
        assert!(sql.contains("NULL::TEXT AS user_name"));

        let sql = select_loans(&[LoanRelation::Book]).into_sql();
        assert!(sql.contains("LEFT JOIN books b"));
        assert!(!sql.contains("LEFT JOIN users u"));

        let sql = select_loans(&LoanRelation::ALL).into_sql();
        assert!(sql.contains("u.name AS user_name"));
        assert!(sql.contains("b.title AS book_title"));
    }

    #[test]
    fn filter_binds_in_order() {
        let filter = LoanFilter {
            user_id: Some(Uuid::new_v4()),
            due_to: Some(Utc::now()),
            ..Default::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM loans l");
        push_filter(&mut builder, &filter);

        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM loans l WHERE l.user_id = $1 AND l.return_date <= $2"
        );
    }
}
