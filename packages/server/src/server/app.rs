//! Application setup and server configuration.

use axum::{
    extract::Extension,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::routes::{
    approve_buyer, approve_buyer_admin, assign_buyer, auto_register_buyer, buyer_events, can_buy,
    check_email_handler, create_buyer, deactivate_buyer, decline_buyer, health_handler, my_buyer,
    show_buyer, stats, update_buyer,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub deps: ServerDeps,
}

/// Build the Axum application router.
///
/// All wiring lives here: the Postgres-backed dependency set is assembled
/// once and handed to every request through an `Extension`.
pub fn build_app(pool: PgPool) -> Router {
    let state = AppState {
        db_pool: pool.clone(),
        deps: ServerDeps::postgres(pool),
    };

    Router::new()
        // Applicant endpoints
        .route("/buyers", post(create_buyer))
        .route("/buyers/my_buyer", get(my_buyer))
        .route("/buyers/check_email", get(check_email_handler))
        .route("/buyers/:id", put(update_buyer).get(show_buyer))
        .route("/buyers/:id/can_buy", get(can_buy))
        // Reviewer endpoints
        .route("/buyers/stats", get(stats))
        .route("/buyers/:id/events", get(buyer_events))
        .route("/buyers/:id/assign", post(assign_buyer))
        .route("/buyers/:id/approve", post(approve_buyer_admin))
        .route("/buyers/:id/decline", post(decline_buyer))
        .route("/buyers/:id/deactivate", post(deactivate_buyer))
        // Token / trusted-service endpoints
        .route("/buyers/approve_buyer", post(approve_buyer))
        .route("/buyers/auto_register", post(auto_register_buyer))
        // Health check
        .route("/health", get(health_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}
