//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, borrow, cart, equipment, health, stats, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Time2Use API",
        version = "1.0.0",
        description = "Equipment lending REST API"
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        // Users
        users::resolve_profile,
        users::list_users,
        users::update_role,
        // Equipment
        equipment::list_equipment,
        equipment::list_categories,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
        // Borrow requests
        borrow::list_requests,
        borrow::list_grouped,
        borrow::get_request,
        borrow::create_request,
        borrow::manage_request,
        borrow::request_return,
        borrow::confirm_return,
        // Cart
        cart::get_cart,
        cart::add_item,
        cart::update_item,
        cart::remove_item,
        cart::clear_cart,
        cart::submit_cart,
        // Stats
        stats::get_statistics,
        stats::get_activity,
    ),
    components(
        schemas(
            // Auth
            auth::LoginResponse,
            crate::models::user::Role,
            crate::models::user::UserProfile,
            crate::models::user::RegisterUser,
            crate::models::user::LoginRequest,
            crate::models::user::UpdateRole,
            // Equipment
            crate::models::equipment::Equipment,
            crate::models::equipment::EquipmentStatus,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            crate::api::PaginatedEquipment,
            // Borrow requests
            crate::models::borrow::BorrowStatus,
            crate::models::borrow::BorrowAction,
            crate::models::borrow::BorrowRequest,
            crate::models::borrow::BorrowRequestView,
            crate::models::borrow::BorrowForm,
            crate::models::borrow::CreateBorrowRequest,
            crate::models::borrow::ReviewDecision,
            crate::models::borrow::ManageBorrowRequest,
            // Cart
            crate::models::cart::CartEquipment,
            crate::models::cart::CartLine,
            crate::models::cart::AddCartItem,
            crate::models::cart::UpdateCartItem,
            crate::services::cart::CartSubmission,
            crate::services::cart::FailedLine,
            // Stats
            stats::StatisticsResponse,
            stats::EquipmentStats,
            stats::RequestStats,
            stats::StatEntry,
            crate::models::activity::ActivityKind,
            crate::models::activity::ActivityEntry,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and login"),
        (name = "users", description = "Profiles and roles"),
        (name = "equipment", description = "Equipment catalog"),
        (name = "borrow", description = "Borrow request lifecycle"),
        (name = "cart", description = "Borrowing cart"),
        (name = "stats", description = "Dashboard statistics and activity")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
