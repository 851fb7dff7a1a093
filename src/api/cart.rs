//! Borrowing cart endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        borrow::BorrowForm,
        cart::{AddCartItem, Cart, CartLine, UpdateCartItem},
    },
    services::cart::CartSubmission,
};

use super::AuthenticatedUser;

/// Current cart contents
#[utoipa::path(
    get,
    path = "/cart",
    tag = "cart",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Cart lines", body = Vec<CartLine>)
    )
)]
pub async fn get_cart(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Cart>> {
    let cart = state.services.cart.get(claims.user_id).await?;
    Ok(Json(cart))
}

/// Add equipment to the cart
#[utoipa::path(
    post,
    path = "/cart/items",
    tag = "cart",
    security(("bearer_auth" = [])),
    request_body = AddCartItem,
    responses(
        (status = 200, description = "Updated cart", body = Vec<CartLine>),
        (status = 404, description = "Equipment not found"),
        (status = 422, description = "Equipment unavailable")
    )
)]
pub async fn add_item(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(item): Json<AddCartItem>,
) -> AppResult<Json<Cart>> {
    let cart = state.services.cart.add(claims.user_id, item).await?;
    Ok(Json(cart))
}

/// Set the quantity of a cart line; zero removes it
#[utoipa::path(
    put,
    path = "/cart/items/{equipment_id}",
    tag = "cart",
    security(("bearer_auth" = [])),
    params(("equipment_id" = i32, Path, description = "Equipment ID")),
    request_body = UpdateCartItem,
    responses(
        (status = 200, description = "Updated cart", body = Vec<CartLine>),
        (status = 404, description = "Equipment is not in the cart")
    )
)]
pub async fn update_item(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(equipment_id): Path<i32>,
    Json(data): Json<UpdateCartItem>,
) -> AppResult<Json<Cart>> {
    let cart = state
        .services
        .cart
        .set_quantity(claims.user_id, equipment_id, data.quantity)
        .await?;
    Ok(Json(cart))
}

/// Remove a cart line
#[utoipa::path(
    delete,
    path = "/cart/items/{equipment_id}",
    tag = "cart",
    security(("bearer_auth" = [])),
    params(("equipment_id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Updated cart", body = Vec<CartLine>),
        (status = 404, description = "Equipment is not in the cart")
    )
)]
pub async fn remove_item(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(equipment_id): Path<i32>,
) -> AppResult<Json<Cart>> {
    let cart = state.services.cart.remove(claims.user_id, equipment_id).await?;
    Ok(Json(cart))
}

/// Empty the cart
#[utoipa::path(
    delete,
    path = "/cart",
    tag = "cart",
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Cart emptied")
    )
)]
pub async fn clear_cart(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<StatusCode> {
    state.services.cart.clear(claims.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Submit every cart line as a borrow request over one date range
#[utoipa::path(
    post,
    path = "/cart/submit",
    tag = "cart",
    security(("bearer_auth" = [])),
    request_body = BorrowForm,
    responses(
        (status = 201, description = "All lines submitted", body = CartSubmission),
        (status = 207, description = "Some lines failed and remain in the cart", body = CartSubmission),
        (status = 400, description = "Invalid dates or empty cart")
    )
)]
pub async fn submit_cart(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(form): Json<BorrowForm>,
) -> AppResult<(StatusCode, Json<CartSubmission>)> {
    let submission = state.services.cart.submit(claims.user_id, form).await?;
    let status = if submission.is_complete() {
        StatusCode::CREATED
    } else {
        StatusCode::MULTI_STATUS
    };
    Ok((status, Json(submission)))
}
