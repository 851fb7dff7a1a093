//! Time2Use Server - Equipment Lending System
//!
//! REST API server for borrowing shared equipment.

use anyhow::Context;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use time2use_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{redis::RedisService, scheduler, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("time2use_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Time2Use Server v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let redis_service = RedisService::new(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?;

    tracing::info!("Connected to Redis");

    let repository = Repository::new(pool.clone());
    let services = Services::new(
        repository,
        config.auth.clone(),
        config.lending.clone(),
        redis_service,
    );

    // Held until shutdown; dropping it stops the job
    let _sweep = scheduler::start_overdue_sweep(
        services.borrows.clone(),
        &config.lending.overdue_sweep_cron,
    )
    .await
    .context("Failed to schedule overdue sweep")?;

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
        pool,
    };

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/register", post(api::auth::register))
        .route("/auth/login", post(api::auth::login))
        // Users
        .route("/user", post(api::users::resolve_profile))
        .route("/users", get(api::users::list_users))
        .route("/users/:id/role", put(api::users::update_role))
        // Equipment
        .route("/equipment", get(api::equipment::list_equipment))
        .route("/equipment", post(api::equipment::create_equipment))
        .route("/equipment/categories", get(api::equipment::list_categories))
        .route("/equipment/:id", get(api::equipment::get_equipment))
        .route("/equipment/:id", put(api::equipment::update_equipment))
        .route("/equipment/:id", delete(api::equipment::delete_equipment))
        // Borrow requests
        .route("/borrow", get(api::borrow::list_requests))
        .route("/borrow", post(api::borrow::create_request))
        .route("/borrow/grouped", get(api::borrow::list_grouped))
        .route("/borrow/manage", post(api::borrow::manage_request))
        .route("/borrow/:id", get(api::borrow::get_request))
        .route("/borrow/:id/return", post(api::borrow::request_return))
        .route("/borrow/:id/confirm-return", post(api::borrow::confirm_return))
        // Cart
        .route("/cart", get(api::cart::get_cart))
        .route("/cart", delete(api::cart::clear_cart))
        .route("/cart/items", post(api::cart::add_item))
        .route("/cart/items/:equipment_id", put(api::cart::update_item))
        .route("/cart/items/:equipment_id", delete(api::cart::remove_item))
        .route("/cart/submit", post(api::cart::submit_cart))
        // Statistics
        .route("/statistics", get(api::stats::get_statistics))
        .route("/activity", get(api::stats::get_activity))
        .with_state(state);

    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api", routes)
        .merge(openapi)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
