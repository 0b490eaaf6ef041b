//! Merchant-facing HTTP API.

pub mod dto;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::application::orchestrator::PaymentOrchestrator;

pub struct AppState {
    pub orchestrator: PaymentOrchestrator,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let payment_routes = Router::new()
        .route("/payments/create", post(handlers::create_payment))
        .route("/payments/process/{token}", get(handlers::process_payment))
        .route("/payments/verify", post(handlers::verify_payment))
        .route("/payments/transactions", get(handlers::list_transactions))
        .route("/payments/stats", get(handlers::transaction_stats));

    let gateway_routes = Router::new().route("/gateway/callback", get(handlers::gateway_callback));

    payment_routes
        .merge(gateway_routes)
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
