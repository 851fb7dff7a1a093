//! Borrow requests repository for database operations
//!
//! Status updates are conditional on the status the caller read
//! (`WHERE status = $expected`). When another reviewer got there first the
//! update matches no row and the method returns `Conflict`.

use chrono::{NaiveDate, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::borrow::{BorrowRequest, BorrowRequestRow, BorrowStatus, CreateBorrowRequest},
};

use super::equipment::adjust_available;

const SELECT_ROWS: &str = r#"
    SELECT b.*, e.name AS equipment_name, e.category AS equipment_category,
           u.display_name AS user_display_name, u.email AS user_email
    FROM borrow_requests b
    JOIN equipment e ON e.id = b.equipment_id
    JOIN users u ON u.id = b.user_id
"#;

/// Filters for listing borrow requests
#[derive(Debug, Default, Clone)]
pub struct BorrowFilter {
    pub user_id: Option<i32>,
    pub status: Option<BorrowStatus>,
    pub search: Option<String>,
}

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get request by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>("SELECT * FROM borrow_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow request {} not found", id)))
    }

    /// Get request with equipment and requester names
    pub async fn get_row(&self, id: i32) -> AppResult<BorrowRequestRow> {
        let sql = format!("{} WHERE b.id = $1", SELECT_ROWS);
        sqlx::query_as::<_, BorrowRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow request {} not found", id)))
    }

    /// List requests, newest first
    pub async fn list(&self, filter: &BorrowFilter) -> AppResult<Vec<BorrowRequestRow>> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if filter.user_id.is_some() {
            conditions.push(format!("b.user_id = ${}", idx));
            idx += 1;
        }
        if filter.status.is_some() {
            conditions.push(format!("b.status = ${}", idx));
            idx += 1;
        }
        if filter.search.is_some() {
            conditions.push(format!(
                "(e.name ILIKE ${0} OR b.purpose ILIKE ${0} OR u.display_name ILIKE ${0})",
                idx
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!("{} {} ORDER BY b.created_at DESC, b.id DESC", SELECT_ROWS, where_clause);

        let mut builder = sqlx::query_as::<_, BorrowRequestRow>(&sql);
        if let Some(user_id) = filter.user_id {
            builder = builder.bind(user_id);
        }
        if let Some(status) = filter.status {
            builder = builder.bind(status);
        }
        if let Some(ref search) = filter.search {
            builder = builder.bind(format!("%{}%", search.trim()));
        }

        Ok(builder.fetch_all(&self.pool).await?)
    }

    /// Insert a new PENDING request
    pub async fn create(&self, user_id: i32, data: &CreateBorrowRequest) -> AppResult<BorrowRequest> {
        let row = sqlx::query_as::<_, BorrowRequest>(
            r#"
            INSERT INTO borrow_requests
                (user_id, equipment_id, quantity, start_date, end_date, status, purpose, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(data.equipment_id)
        .bind(data.quantity)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(BorrowStatus::Pending)
        .bind(&data.purpose)
        .bind(&data.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Approve: take the units out of the equipment stock and set the status
    pub async fn approve(
        &self,
        request: &BorrowRequest,
        to: BorrowStatus,
        reviewer_id: i32,
    ) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        adjust_available(&mut tx, request.equipment_id, -request.quantity).await?;

        let updated = sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = $1, approved_by = $2, approved_at = $3, updated_at = $3
            WHERE id = $4 AND status = $5
            RETURNING *
            "#,
        )
        .bind(to)
        .bind(reviewer_id)
        .bind(Utc::now())
        .bind(request.id)
        .bind(request.status)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| changed_meanwhile(request))?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Reject with an optional reason
    pub async fn reject(
        &self,
        request: &BorrowRequest,
        to: BorrowStatus,
        reviewer_id: i32,
        reason: Option<&str>,
    ) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = $1, approved_by = $2, approved_at = $3, rejection_reason = $4, updated_at = $3
            WHERE id = $5 AND status = $6
            RETURNING *
            "#,
        )
        .bind(to)
        .bind(reviewer_id)
        .bind(Utc::now())
        .bind(reason)
        .bind(request.id)
        .bind(request.status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| changed_meanwhile(request))
    }

    /// Borrower asks to hand the equipment back
    pub async fn request_return(&self, request: &BorrowRequest, to: BorrowStatus) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = $1, return_requested_at = $2, updated_at = $2
            WHERE id = $3 AND status = $4
            RETURNING *
            "#,
        )
        .bind(to)
        .bind(Utc::now())
        .bind(request.id)
        .bind(request.status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| changed_meanwhile(request))
    }

    /// Reviewer confirms the equipment is back; units return to stock
    pub async fn confirm_return(
        &self,
        request: &BorrowRequest,
        to: BorrowStatus,
        reviewer_id: i32,
    ) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let updated = sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = $1, actual_return_date = $2, return_confirmed_by = $3,
                return_confirmed_at = $2, updated_at = $2
            WHERE id = $4 AND status = $5
            RETURNING *
            "#,
        )
        .bind(to)
        .bind(now)
        .bind(reviewer_id)
        .bind(request.id)
        .bind(request.status)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| changed_meanwhile(request))?;

        adjust_available(&mut tx, request.equipment_id, request.quantity).await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Move every request in `from` whose end date is before `today` to `to`.
    /// Returns the affected request ids.
    pub async fn mark_overdue(
        &self,
        from: &[BorrowStatus],
        to: BorrowStatus,
        today: NaiveDate,
    ) -> AppResult<Vec<i32>> {
        let from: Vec<String> = from.iter().map(|s| s.to_string()).collect();
        let ids: Vec<i32> = sqlx::query_scalar(
            r#"
            UPDATE borrow_requests
            SET status = $1, updated_at = NOW()
            WHERE status = ANY($2) AND end_date < $3
            RETURNING id
            "#,
        )
        .bind(to)
        .bind(&from)
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Request counts per status
    pub async fn count_by_status(&self) -> AppResult<Vec<(BorrowStatus, i64)>> {
        let rows: Vec<(BorrowStatus, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*)::bigint FROM borrow_requests GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

fn changed_meanwhile(request: &BorrowRequest) -> AppError {
    AppError::Conflict(format!(
        "Borrow request {} is no longer {}",
        request.id, request.status
    ))
}
