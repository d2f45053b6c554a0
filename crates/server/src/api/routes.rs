use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{
    handlers, legacy, middleware::metrics_middleware, print_jobs, sales, templates, tickets,
};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Templates
        .route("/templates", get(templates::list_templates))
        .route("/templates/{name}", get(templates::get_template))
        // Tickets
        .route("/tickets/pool", post(tickets::create_pool))
        .route("/tickets/{barcode}", get(tickets::get_by_barcode))
        // Point of sale
        .route("/sales/validate", post(sales::validate_sale))
        .route("/sales", post(sales::sell))
        // Print jobs
        .route("/print-jobs", post(print_jobs::create_job))
        .route("/print-jobs", get(print_jobs::list_jobs))
        .route("/print-jobs/{id}", get(print_jobs::get_job))
        .route("/print-jobs/{id}/cancel", post(print_jobs::cancel_job))
        .route("/print-jobs/{id}/retry", post(print_jobs::retry_job))
        // Legacy migration
        .route("/legacy/migrate", post(legacy::migrate));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
