//! Statistics and activity feed service

use crate::{
    api::stats::{EquipmentStats, RequestStats, StatEntry, StatisticsResponse},
    error::AppResult,
    models::{activity::ActivityEntry, borrow::BorrowStatus},
    repository::Repository,
};

/// Feed entries derived from request timestamps, one SELECT per event kind
const ACTIVITY_SQL: &str = r#"
    SELECT * FROM (
        SELECT 'requested' AS kind, b.created_at AS occurred_at, b.id AS request_id,
               b.quantity, b.equipment_id, e.name AS equipment_name,
               u.display_name AS user_display_name, NULL::text AS actor_display_name
        FROM borrow_requests b
        JOIN equipment e ON e.id = b.equipment_id
        JOIN users u ON u.id = b.user_id

        UNION ALL

        SELECT CASE WHEN b.status = 'REJECTED' THEN 'rejected' ELSE 'approved' END,
               b.approved_at, b.id, b.quantity, b.equipment_id, e.name,
               u.display_name, a.display_name
        FROM borrow_requests b
        JOIN equipment e ON e.id = b.equipment_id
        JOIN users u ON u.id = b.user_id
        LEFT JOIN users a ON a.id = b.approved_by
        WHERE b.approved_at IS NOT NULL

        UNION ALL

        SELECT 'return_requested', b.return_requested_at, b.id, b.quantity, b.equipment_id,
               e.name, u.display_name, NULL::text
        FROM borrow_requests b
        JOIN equipment e ON e.id = b.equipment_id
        JOIN users u ON u.id = b.user_id
        WHERE b.return_requested_at IS NOT NULL

        UNION ALL

        SELECT 'returned', b.return_confirmed_at, b.id, b.quantity, b.equipment_id,
               e.name, u.display_name, c.display_name
        FROM borrow_requests b
        JOIN equipment e ON e.id = b.equipment_id
        JOIN users u ON u.id = b.user_id
        LEFT JOIN users c ON c.id = b.return_confirmed_by
        WHERE b.return_confirmed_at IS NOT NULL
    ) feed
    ORDER BY occurred_at DESC, request_id DESC
    LIMIT $1
"#;

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Aggregate counters for the dashboard
    pub async fn get_statistics(&self) -> AppResult<StatisticsResponse> {
        let pool = &self.repository.pool;

        let (items, units, available_units) = self.repository.equipment.totals().await?;

        let by_category: Vec<StatEntry> = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT category, COALESCE(SUM(total_quantity), 0)::bigint
            FROM equipment
            WHERE status != 'RETIRED'
            GROUP BY category
            ORDER BY 2 DESC, category
            "#,
        )
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|(label, value)| StatEntry { label, value })
        .collect();

        let counts = self.repository.borrows.count_by_status().await?;
        let by_status = fill_status_counts(&counts);
        let total_requests = counts.iter().map(|(_, n)| n).sum();
        let count_of = |status: BorrowStatus| {
            counts
                .iter()
                .find(|(s, _)| *s == status)
                .map(|(_, n)| *n)
                .unwrap_or(0)
        };

        let most_requested: Vec<StatEntry> = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT e.name, COUNT(b.id)::bigint AS requests
            FROM borrow_requests b
            JOIN equipment e ON e.id = b.equipment_id
            GROUP BY e.id, e.name
            ORDER BY requests DESC, e.name
            LIMIT 5
            "#,
        )
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|(label, value)| StatEntry { label, value })
        .collect();

        let users = self.repository.users.count().await?;

        Ok(StatisticsResponse {
            equipment: EquipmentStats {
                items,
                units,
                available_units,
                lent_units: units - available_units,
                by_category,
            },
            requests: RequestStats {
                total: total_requests,
                pending: count_of(BorrowStatus::Pending),
                overdue: count_of(BorrowStatus::Overdue),
                awaiting_return: count_of(BorrowStatus::PendingReturn),
                by_status,
                most_requested,
            },
            users,
        })
    }

    /// Most recent lifecycle events, newest first
    pub async fn get_activity(&self, limit: i64) -> AppResult<Vec<ActivityEntry>> {
        let entries = sqlx::query_as::<_, ActivityEntry>(ACTIVITY_SQL)
            .bind(limit.clamp(1, 500))
            .fetch_all(&self.repository.pool)
            .await?;
        Ok(entries)
    }
}

/// One entry per status in lifecycle order, zero when absent
pub fn fill_status_counts(counts: &[(BorrowStatus, i64)]) -> Vec<StatEntry> {
    BorrowStatus::ALL
        .into_iter()
        .map(|status| StatEntry {
            label: status.to_string(),
            value: counts
                .iter()
                .find(|(s, _)| *s == status)
                .map(|(_, n)| *n)
                .unwrap_or(0),
        })
        .collect()
}
