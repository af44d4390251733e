//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection, seeding, engine and registry
//! - `routes/`: HTTP routes + handlers (one file per caller group)
//! - `dto.rs`: request/response DTOs and presence checks
//! - `errors.rs`: consistent success and error envelopes

use std::sync::Arc;

use axum::http::{HeaderValue, Method, header};
use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use evax_auth::Hs256Tokens;
use evax_infra::AppConfig;

use crate::middleware::AuthState;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let tokens = Arc::new(Hs256Tokens::new(
        config.jwt_secret.as_bytes(),
        config.token_ttl(),
    ));
    let services = services::build_services(config, tokens.clone()).await?;
    let auth = AuthState { jwt: tokens };

    Ok(router(Arc::new(services), auth, config))
}

/// Assemble routes and layers around already-built services.
pub fn router(services: Arc<services::AppServices>, auth: AuthState, config: &AppConfig) -> Router {
    Router::new()
        .route("/", get(routes::system::root))
        .route("/health", get(routes::system::health))
        .route("/api/test", get(routes::system::connectivity))
        .nest("/api/admin", routes::admin::router(auth.clone()))
        .nest("/api/staff", routes::staff::router(auth.clone()))
        .nest("/api/user", routes::user::router(auth.clone()))
        .nest("/api/vaccine", routes::vaccine::router(auth))
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
                .layer(cors(&config.cors_origins)),
        )
}

fn cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
