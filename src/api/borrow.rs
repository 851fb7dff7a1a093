//! Borrow request endpoints

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use indexmap::IndexMap;

use crate::{
    error::AppResult,
    models::borrow::{
        BorrowQuery, BorrowRequest, BorrowRequestView, BorrowStatus, CreateBorrowRequest,
        ManageBorrowRequest,
    },
};

use super::AuthenticatedUser;

/// List borrow requests visible to the caller
#[utoipa::path(
    get,
    path = "/borrow",
    tag = "borrow",
    security(("bearer_auth" = [])),
    params(BorrowQuery),
    responses(
        (status = 200, description = "Borrow requests, newest first", body = Vec<BorrowRequestView>),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowQuery>,
) -> AppResult<Json<Vec<BorrowRequestView>>> {
    let requests = state.services.borrows.list(&claims, &query).await?;
    Ok(Json(requests))
}

/// Review queue grouped by status (moderators and admins)
#[utoipa::path(
    get,
    path = "/borrow/grouped",
    tag = "borrow",
    security(("bearer_auth" = [])),
    params(BorrowQuery),
    responses(
        (status = 200, description = "Requests keyed by status, in lifecycle order", body = HashMap<String, Vec<BorrowRequestView>>),
        (status = 403, description = "Not a reviewer")
    )
)]
pub async fn list_grouped(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowQuery>,
) -> AppResult<Json<IndexMap<BorrowStatus, Vec<BorrowRequestView>>>> {
    let groups = state.services.borrows.grouped(&claims, &query).await?;
    Ok(Json(groups))
}

/// Get a single borrow request
#[utoipa::path(
    get,
    path = "/borrow/{id}",
    tag = "borrow",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Borrow request", body = BorrowRequestView),
        (status = 403, description = "Not the owner or a reviewer"),
        (status = 404, description = "Borrow request not found")
    )
)]
pub async fn get_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowRequestView>> {
    let request = state.services.borrows.get(&claims, id).await?;
    Ok(Json(request))
}

/// File a borrow request for one piece of equipment
#[utoipa::path(
    post,
    path = "/borrow",
    tag = "borrow",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowRequest,
    responses(
        (status = 201, description = "Request created as PENDING", body = BorrowRequest),
        (status = 400, description = "Invalid dates or quantity"),
        (status = 404, description = "Equipment not found"),
        (status = 422, description = "Equipment unavailable")
    )
)]
pub async fn create_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateBorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowRequest>)> {
    let today = Utc::now().date_naive();
    let request = state
        .services
        .borrows
        .create(claims.user_id, data, today)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Approve or reject a pending request (moderators and admins)
#[utoipa::path(
    post,
    path = "/borrow/manage",
    tag = "borrow",
    security(("bearer_auth" = [])),
    request_body = ManageBorrowRequest,
    responses(
        (status = 200, description = "Decision recorded", body = BorrowRequestView),
        (status = 403, description = "Not a reviewer"),
        (status = 409, description = "Request is not pending"),
        (status = 422, description = "Not enough units available")
    )
)]
pub async fn manage_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(body): Json<ManageBorrowRequest>,
) -> AppResult<Json<BorrowRequestView>> {
    let request = state.services.borrows.manage(&claims, body).await?;
    Ok(Json(request))
}

/// Ask to hand the equipment back (request owner)
#[utoipa::path(
    post,
    path = "/borrow/{id}/return",
    tag = "borrow",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Return requested", body = BorrowRequestView),
        (status = 403, description = "Not the owner"),
        (status = 409, description = "Request cannot be returned in its current status")
    )
)]
pub async fn request_return(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowRequestView>> {
    let request = state.services.borrows.request_return(&claims, id).await?;
    Ok(Json(request))
}

/// Confirm the equipment is back (moderators and admins)
#[utoipa::path(
    post,
    path = "/borrow/{id}/confirm-return",
    tag = "borrow",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Return confirmed", body = BorrowRequestView),
        (status = 403, description = "Not a reviewer"),
        (status = 409, description = "No return is pending")
    )
)]
pub async fn confirm_return(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowRequestView>> {
    let request = state.services.borrows.confirm_return(&claims, id).await?;
    Ok(Json(request))
}
