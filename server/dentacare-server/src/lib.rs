//! DentaCare Server - REST API for dental clinic operations
//!
//! Wires the identity, access-control, patient, reservation and medical
//! record services behind an axum router under `/api/v1`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod policies;
pub mod routes;
pub mod server;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use error::*;
pub use server::ClinicServer;

use axum::{middleware::from_fn, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the main application router with all routes and middleware
pub fn create_app(server: ClinicServer) -> Router {
    let cors = middleware::create_cors_layer(&server.config.cors_origins());
    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(from_fn(middleware::request_timing_middleware)),
        )
        .with_state(server)
}
