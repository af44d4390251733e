//! Administrator routes: account, staff management and the central stock pool.

use std::sync::Arc;

use axum::{
    Router,
    extract::Extension,
    routing::{patch, post},
};
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
        .route("/create-staff", post(create_staff))
        .route("/update-stock", post(update_stock))
        .route("/assign-vaccine", post(assign_vaccine))
        .route("/update-quantity", patch(update_quantity))
        .route("/get-staff", post(get_staff))
        .route_layer(axum::middleware::from_fn_with_state(auth, auth_middleware))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/get-stock", post(get_stock))
}

pub async fn signup(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<dto::AdminSignupRequest>,
) -> ApiResult {
    let admin = services.registry.register_admin(body.into_new_admin()?).await?;
    created("Admin registered successfully", dto::AdminView::from(&admin))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<dto::LoginRequest>,
) -> ApiResult {
    let (email, password) = body.into_credentials()?;
    let session = services.registry.login_admin(&email, &password).await?;
    ok(
        "Login successful",
        dto::SessionView {
            token: session.token,
            account: dto::AdminView::from(&session.account),
        },
    )
}

pub async fn logout(Extension(principal): Extension<PrincipalContext>) -> ApiResult {
    authz::require(&principal, Role::Admin)?;
    info!(admin_id = %principal.admin_id(), "admin logged out");
    ok("Logged out successfully", ())
}

pub async fn create_staff(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::CreateStaffRequest>,
) -> ApiResult {
    authz::require(&principal, Role::Admin)?;
    let staff = services
        .registry
        .create_staff(&principal.admin_id(), body.into_new_staff()?)
        .await?;
    created("Staff created successfully", dto::StaffView::from(&staff))
}

pub async fn update_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::UpdateStockRequest>,
) -> ApiResult {
    authz::require(&principal, Role::Admin)?;
    let (vaccine_name, quantity) = body.into_parts()?;
    let pool = services
        .engine
        .top_up_stock(&principal.admin_id(), vaccine_name, quantity)
        .await?;
    ok("Stock updated successfully", pool)
}

pub async fn get_stock(Extension(services): Extension<Arc<AppServices>>) -> ApiResult {
    let pool = services.engine.get_stock().await?;
    ok("Stock fetched successfully", pool)
}

pub async fn assign_vaccine(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::AssignVaccineRequest>,
) -> ApiResult {
    authz::require(&principal, Role::Admin)?;
    let input = body.into_input()?;
    let staff = services
        .engine
        .assign_to_staff(&input.staff_id, input.vaccine_name, input.quantity, input.as_of)
        .await?;
    ok("Vaccine assigned successfully", dto::StaffView::from(&staff))
}

pub async fn update_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::UpdateQuantityRequest>,
) -> ApiResult {
    authz::require(&principal, Role::Admin)?;
    let (staff_id, quantity) = body.into_staff_and_quantity()?;
    let assignment = services
        .engine
        .update_remaining_quantity(&staff_id, quantity)
        .await?;
    ok("Remaining quantity updated successfully", assignment)
}

pub async fn get_staff(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    authz::require(&principal, Role::Admin)?;
    let members = services.registry.list_staff(&principal.admin_id()).await?;
    let views: Vec<dto::StaffView> = members.iter().map(dto::StaffView::from).collect();
    ok("Staff fetched successfully", views)
}
