//! API handlers for Time2Use REST endpoints

pub mod auth;
pub mod borrow;
pub mod cart;
pub mod equipment;
pub mod health;
pub mod openapi;
pub mod stats;
pub mod users;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Paginated list response
#[derive(Serialize, ToSchema)]
#[aliases(PaginatedEquipment = PaginatedResponse<crate::models::equipment::Equipment>)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Page content
    pub items: Vec<T>,
    /// Total number of matching entries
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Entries per page
    pub per_page: i64,
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Extractor for authenticated user from JWT token.
///
/// The token is read from the `Authorization: Bearer` header, or from a
/// `token` query parameter when the header is absent. The role is reloaded
/// from the database on every request.
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = match parts.headers.get(AUTHORIZATION) {
            Some(value) => {
                let header = value
                    .to_str()
                    .map_err(|_| AppError::Authentication("Invalid authorization header".to_string()))?;
                header
                    .strip_prefix("Bearer ")
                    .ok_or_else(|| {
                        AppError::Authentication("Invalid authorization header format".to_string())
                    })?
                    .to_string()
            }
            None => Query::<TokenQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(q)| q.token)
                .ok_or_else(|| AppError::Authentication("Missing authorization token".to_string()))?,
        };

        let claims = UserClaims::from_token(&token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        // Role checks use the stored role, not the one the token was issued with
        let claims = state.services.users.current_claims(claims).await?;

        Ok(AuthenticatedUser(claims))
    }
}
