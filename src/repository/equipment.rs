//! Equipment repository for database operations

use chrono::Utc;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::BorrowStatus,
        equipment::{CreateEquipment, Equipment, EquipmentQuery, EquipmentStatus, UpdateEquipment},
    },
};

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Search equipment with filters and pagination
    pub async fn list(&self, query: &EquipmentQuery) -> AppResult<(Vec<Equipment>, i64)> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.category.is_some() {
            conditions.push(format!("category = ${}", idx));
            idx += 1;
        }
        if query.status.is_some() {
            conditions.push(format!("status = ${}", idx));
            idx += 1;
        }
        if query.search.is_some() {
            conditions.push(format!("(name ILIKE ${0} OR description ILIKE ${0})", idx));
            idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let (_, per_page) = query.pagination();
        let search = query.search.as_ref().map(|s| format!("%{}%", s.trim()));

        macro_rules! bind_filters {
            ($builder:expr) => {{
                let mut builder = $builder;
                if let Some(ref category) = query.category {
                    builder = builder.bind(category);
                }
                if let Some(status) = query.status {
                    builder = builder.bind(status);
                }
                if let Some(ref pattern) = search {
                    builder = builder.bind(pattern);
                }
                builder
            }};
        }

        let count_sql = format!("SELECT COUNT(*) FROM equipment {}", where_clause);
        let total: i64 = bind_filters!(sqlx::query_scalar::<_, i64>(&count_sql))
            .fetch_one(&self.pool)
            .await?;

        let list_sql = format!(
            "SELECT * FROM equipment {} ORDER BY name, id LIMIT ${} OFFSET ${}",
            where_clause,
            idx,
            idx + 1
        );
        let rows = bind_filters!(sqlx::query_as::<_, Equipment>(&list_sql))
            .bind(per_page)
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    /// Get equipment by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Distinct categories, sorted
    pub async fn categories(&self) -> AppResult<Vec<String>> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT category FROM equipment ORDER BY category")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    /// Create equipment; every unit starts available
    pub async fn create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        let status = data
            .status
            .unwrap_or(EquipmentStatus::Available)
            .follow_availability(data.total_quantity);

        let row = sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipment (name, category, description, total_quantity, available_quantity, status)
            VALUES ($1, $2, $3, $4, $4, $5)
            RETURNING *
            "#,
        )
        .bind(data.name.trim())
        .bind(data.category.trim())
        .bind(&data.description)
        .bind(data.total_quantity)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update equipment under a row lock.
    ///
    /// Availability and status are derived from the locked row, so a
    /// concurrent approve or return cannot be overwritten.
    pub async fn update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        let mut tx = self.pool.begin().await?;

        let current =
            sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))?;

        let stock = current.plan_update(data)?;

        let mut sets = vec!["updated_at = $1".to_string()];
        let mut idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.name, "name");
        add_field!(data.category, "category");
        add_field!(data.description, "description");
        add_field!(data.total_quantity, "total_quantity");
        add_field!(stock.available_quantity, "available_quantity");
        add_field!(stock.status, "status");

        let query = format!(
            "UPDATE equipment SET {} WHERE id = ${} RETURNING *",
            sets.join(", "),
            idx
        );

        let mut builder = sqlx::query_as::<_, Equipment>(&query).bind(Utc::now());

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.category);
        bind_field!(data.description);
        bind_field!(data.total_quantity);
        bind_field!(stock.available_quantity);
        bind_field!(stock.status);

        let updated = builder.bind(id).fetch_one(&mut *tx).await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Whether any request still holds or waits for this equipment
    pub async fn has_open_requests(&self, id: i32) -> AppResult<bool> {
        let terminal: Vec<String> = BorrowStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .map(|s| s.to_string())
            .collect();

        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM borrow_requests
                WHERE equipment_id = $1 AND NOT (status = ANY($2))
            )
            "#,
        )
        .bind(id)
        .bind(&terminal)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Delete equipment and its closed request history
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Equipment {} not found", id)));
        }
        Ok(())
    }

    /// Equipment totals: (items, units, available units)
    pub async fn totals(&self) -> AppResult<(i64, i64, i64)> {
        let row: (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*)::bigint,
                   COALESCE(SUM(total_quantity), 0)::bigint,
                   COALESCE(SUM(available_quantity), 0)::bigint
            FROM equipment
            WHERE status != 'RETIRED'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}

/// Shift available units of one equipment inside a transaction.
///
/// The row is locked for the rest of the transaction. A negative `delta`
/// that would take availability below zero fails with `BusinessRule`.
pub(crate) async fn adjust_available(
    conn: &mut PgConnection,
    equipment_id: i32,
    delta: i32,
) -> AppResult<Equipment> {
    let equipment =
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1 FOR UPDATE")
            .bind(equipment_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", equipment_id)))?;

    let available = equipment.available_quantity + delta;
    if available < 0 {
        return Err(AppError::BusinessRule(format!(
            "Only {} unit(s) of {} available, {} requested",
            equipment.available_quantity, equipment.name, -delta
        )));
    }
    let available = available.min(equipment.total_quantity);
    let status = equipment.status.follow_availability(available);

    let updated = sqlx::query_as::<_, Equipment>(
        r#"
        UPDATE equipment
        SET available_quantity = $1, status = $2, updated_at = $3
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(available)
    .bind(status)
    .bind(Utc::now())
    .bind(equipment_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(updated)
}
