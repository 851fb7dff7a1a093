//! Dashboard statistics and activity feed endpoints

use axum::{extract::Query, extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::activity::{ActivityEntry, ActivityQuery},
};

use super::AuthenticatedUser;

/// Statistics response
#[derive(Debug, Serialize, ToSchema)]
pub struct StatisticsResponse {
    /// Equipment inventory
    pub equipment: EquipmentStats,
    /// Borrow request counters
    pub requests: RequestStats,
    /// Number of registered users
    pub users: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EquipmentStats {
    /// Equipment entries, retired excluded
    pub items: i64,
    /// Sum of total quantities
    pub units: i64,
    /// Units on the shelf
    pub available_units: i64,
    /// Units currently lent out
    pub lent_units: i64,
    /// Units per category
    pub by_category: Vec<StatEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequestStats {
    pub total: i64,
    pub pending: i64,
    pub overdue: i64,
    /// Requests in PENDING_RETURN
    pub awaiting_return: i64,
    /// Count per status, lifecycle order
    pub by_status: Vec<StatEntry>,
    /// Top five equipment by number of requests
    pub most_requested: Vec<StatEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatEntry {
    pub label: String,
    pub value: i64,
}

/// Dashboard statistics (moderators and admins)
#[utoipa::path(
    get,
    path = "/statistics",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard counters", body = StatisticsResponse),
        (status = 403, description = "Not a reviewer")
    )
)]
pub async fn get_statistics(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<StatisticsResponse>> {
    claims.require_reviewer()?;
    let stats = state.services.stats.get_statistics().await?;
    Ok(Json(stats))
}

/// Recent lifecycle events (moderators and admins)
#[utoipa::path(
    get,
    path = "/activity",
    tag = "stats",
    security(("bearer_auth" = [])),
    params(ActivityQuery),
    responses(
        (status = 200, description = "Newest events first", body = Vec<ActivityEntry>),
        (status = 403, description = "Not a reviewer")
    )
)]
pub async fn get_activity(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ActivityQuery>,
) -> AppResult<Json<Vec<ActivityEntry>>> {
    claims.require_reviewer()?;
    let limit = query.limit.unwrap_or(state.config.lending.activity_limit);
    let entries = state.services.stats.get_activity(limit).await?;
    Ok(Json(entries))
}
