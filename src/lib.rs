//! Nitrogen tank ledger.
//!
//! Tracks tanks in and out of the warehouse through an append-only log of
//! dispatch and receipt movements, reports what is currently out, and rebuilds
//! tank state from the log when the two disagree.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
#[allow(elided_lifetimes_in_paths)]
pub mod migrator;
pub mod services;
pub mod tracing;

use axum::{
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use services::LedgerServices;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: LedgerServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let services = LedgerServices::new(db.clone());
        Self {
            db,
            config,
            services,
        }
    }
}

pub fn api_v1_routes() -> Router<AppState> {
    let tanks = Router::new()
        .route("/tanks", get(handlers::tanks::list_tanks))
        .route("/tanks/seed", post(handlers::tanks::seed_tanks))
        .route("/tanks/:serial", get(handlers::tanks::get_tank));

    let movements = Router::new().route(
        "/movements",
        get(handlers::movements::list_movements).post(handlers::movements::record_movement),
    );

    let reports = Router::new()
        .route(
            "/reports/out-by-engineer",
            get(handlers::reports::out_by_engineer),
        )
        .route(
            "/reports/movement-counts",
            get(handlers::reports::movement_counts),
        );

    let maintenance = Router::new()
        .route(
            "/maintenance/recompute",
            post(handlers::maintenance::recompute),
        )
        .route("/maintenance/drift", get(handlers::maintenance::drift));

    Router::new()
        .merge(tanks)
        .merge(movements)
        .merge(reports)
        .merge(maintenance)
}

/// Full application router: health, the v1 API, request tracing and CORS.
/// CORS is permissive only in development.
pub fn app_router(state: AppState) -> Router {
    let cors = if state.config.is_development() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(crate::tracing::configure_http_tracing())
        .layer(cors)
        .with_state(state)
}
