//! Citizen account routes.

use std::sync::Arc;

use axum::{Router, extract::Extension, routing::post};
use serde_json::json;
use tracing::info;

use evax_auth::Role;

use crate::app::dto::{self, JsonBody};
use crate::app::errors::{ApiResult, created, ok};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;
use crate::middleware::{AuthState, auth_middleware};

pub fn router(auth: AuthState) -> Router {
    Router::new()
        .route("/logout", post(logout))
        .route_layer(axum::middleware::from_fn_with_state(auth, auth_middleware))
        .route("/signup", post(signup))
        .route("/login", post(login))
}

pub async fn signup(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<dto::CitizenSignupRequest>,
) -> ApiResult {
    let (profile, password) = body.into_profile()?;
    let (citizen, card) = services
        .registry
        .register_citizen(profile, &password)
        .await?;
    created(
        "User registered successfully",
        json!({ "user": dto::CitizenView::from(&citizen), "card": card }),
    )
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<dto::LoginRequest>,
) -> ApiResult {
    let (email, password) = body.into_credentials()?;
    let session = services.registry.login_citizen(&email, &password).await?;
    ok(
        "Login successful",
        dto::SessionView {
            token: session.token,
            account: dto::CitizenView::from(&session.account),
        },
    )
}

pub async fn logout(Extension(principal): Extension<PrincipalContext>) -> ApiResult {
    authz::require(&principal, Role::Citizen)?;
    info!(citizen_id = %principal.citizen_id(), "citizen logged out");
    ok("Logged out successfully", ())
}
