//! API service routes

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    middleware,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::{config::ServerConfig, middleware::auth_middleware, state::AppState};

pub mod auth;
pub mod feed;
pub mod follow;
pub mod loans;
pub mod messages;
pub mod savings;
pub mod users;

/// Create the router for the API service
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let protected_routes = Router::new()
        .nest("/users", users::router())
        .nest("/follow", follow::router())
        .nest("/feed", feed::router())
        .nest("/messages", messages::router())
        .nest("/loans", loans::router())
        .nest("/savings", savings::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_v1 = Router::new()
        .nest("/auth", auth::router())
        .merge(protected_routes);

    Router::new()
        .route("/", get(service_banner))
        .route("/health", get(health_check))
        .route("/ws", get(crate::realtime::ws_handler))
        .nest("/api/v1", api_v1)
        .layer(cors_layer(config))
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Service banner
pub async fn service_banner() -> impl IntoResponse {
    Json(json!({
        "name": "FinSphere API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Health check endpoint, reports database connectivity
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl IntoResponse {
    let database = match common::database::health_check(&state.db_pool).await {
        Ok(true) => "up",
        _ => "down",
    };

    Json(json!({
        "status": "ok",
        "service": "finsphere-api",
        "database": database
    }))
}
