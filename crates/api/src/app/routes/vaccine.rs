//! Citizen vaccine routes, scoped to the caller's own birth id.

use std::sync::Arc;

use axum::{Router, extract::Extension, routing::post};

use evax_auth::Role;
use evax_core::BirthId;

use crate::app::dto::{self, JsonBody};
use crate::app::errors::{ApiResult, created, ok};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;
use crate::middleware::{AuthState, auth_middleware};

pub fn router(auth: AuthState) -> Router {
    Router::new()
        .route("/first-dose", post(first_dose))
        .route("/next-dose", post(next_dose))
        .route("/card", post(card))
        .route_layer(axum::middleware::from_fn_with_state(auth, auth_middleware))
}

/// The birth id the calling citizen may act on.
async fn scoped_birth_id(
    services: &AppServices,
    principal: &PrincipalContext,
    requested: Option<&str>,
) -> ApiResult<BirthId> {
    authz::require(principal, Role::Citizen)?;
    let citizen = services.registry.citizen(&principal.citizen_id()).await?;
    authz::scope_birth_id(citizen.birth_id(), requested)
}

pub async fn first_dose(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::FirstDoseRequest>,
) -> ApiResult {
    let birth_id = scoped_birth_id(&services, &principal, body.birth_id.as_deref()).await?;
    let card = services
        .engine
        .schedule_first_dose(body.into_dose(birth_id)?)
        .await?;
    created("First dose scheduled successfully", card)
}

pub async fn next_dose(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::NextDoseRequest>,
) -> ApiResult {
    let birth_id = scoped_birth_id(&services, &principal, body.birth_id.as_deref()).await?;
    let card = services
        .engine
        .schedule_next_dose(body.into_dose(birth_id)?)
        .await?;
    created("Next dose scheduled successfully", card)
}

pub async fn card(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::BirthIdRequest>,
) -> ApiResult {
    let birth_id = scoped_birth_id(&services, &principal, body.birth_id.as_deref()).await?;
    let card = services.engine.get_vaccine_card(&birth_id).await?;
    ok("Vaccine card fetched successfully", card)
}
