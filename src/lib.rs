//! Cart API Library
//!
//! Shopping-cart service: transactional cart upserts, cart queries, line
//! removal, and the daily abandoned-cart reminder sweep.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod notifications;
pub mod services;
pub mod tracing;

#[cfg(test)]
mod test_support;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
};

use crate::auth::{AuthRouterExt, AuthService};
use crate::middleware_helpers::request_id::{request_id_middleware, REQUEST_ID_HEADER};
use crate::services::commerce::{CartService, ProductCatalogService};

pub use context::AppContext;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<config::AppConfig>,
    pub event_sender: Arc<events::EventSender>,
    pub auth: Arc<AuthService>,
    pub carts: CartService,
    pub catalog: ProductCatalogService,
}

/// Builds the HTTP router: authenticated cart routes plus `/health`.
pub fn build_router(state: AppState) -> Router {
    let cart_routes = handlers::commerce::cart_routes().with_auth(state.auth.clone());

    Router::new()
        .merge(cart_routes)
        .merge(handlers::health::health_routes())
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(cors_layer(&state.config))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}

fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        if cfg.is_development() {
            ::tracing::info!("Using permissive CORS because explicit origins were not configured");
            return CorsLayer::permissive();
        }
        // No cross-origin access outside development without explicit origins.
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}
