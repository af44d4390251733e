//! Staff routes: the caller's own assignment, dose administration and stats.

use std::sync::Arc;

use axum::{
    Router,
    extract::Extension,
    routing::{get, patch, post},
};
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
        .route("/assigned", get(assigned))
        .route("/update-quantity", patch(update_quantity))
        .route("/administer", post(administer))
        .route("/stats", get(stats))
        .route("/get-user", post(get_user))
        .route_layer(axum::middleware::from_fn_with_state(auth, auth_middleware))
        .route("/login", post(login))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<dto::LoginRequest>,
) -> ApiResult {
    let (email, password) = body.into_credentials()?;
    let session = services.registry.login_staff(&email, &password).await?;
    ok(
        "Login successful",
        dto::SessionView {
            token: session.token,
            account: dto::StaffView::from(&session.account),
        },
    )
}

pub async fn logout(Extension(principal): Extension<PrincipalContext>) -> ApiResult {
    authz::require(&principal, Role::Staff)?;
    info!(staff_id = %principal.staff_id(), "staff logged out");
    ok("Logged out successfully", ())
}

pub async fn assigned(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    authz::require(&principal, Role::Staff)?;
    let assignment = services
        .engine
        .get_assigned_vaccine(&principal.staff_id())
        .await?;
    ok("Assigned vaccine fetched successfully", assignment)
}

pub async fn update_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::UpdateQuantityRequest>,
) -> ApiResult {
    authz::require(&principal, Role::Staff)?;
    let quantity = body.into_quantity()?;
    let assignment = services
        .engine
        .update_remaining_quantity(&principal.staff_id(), quantity)
        .await?;
    ok("Remaining quantity updated successfully", assignment)
}

pub async fn administer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::AdministerRequest>,
) -> ApiResult {
    authz::require(&principal, Role::Staff)?;
    let card = services
        .engine
        .administer_dose(body.into_dose(principal.staff_id())?)
        .await?;
    created("Vaccine administered successfully", card)
}

pub async fn stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    authz::require(&principal, Role::Staff)?;
    let stats = services.engine.compute_stats(&principal.staff_id()).await?;
    ok("Staff stats fetched successfully", stats)
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::BirthIdRequest>,
) -> ApiResult {
    authz::require(&principal, Role::Staff)?;
    let (citizen, card) = services
        .registry
        .citizen_by_birth_id(&body.into_birth_id()?)
        .await?;
    ok(
        "User fetched successfully",
        json!({ "user": dto::CitizenView::from(&citizen), "card": card }),
    )
}
