use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::admin::plans::{self, AdminOverview};
use crate::auth::extractors::AdminUser;
use crate::errors::{AppError, FieldErrors};
use crate::models::user::{Plan, User, UserPage};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub search: Option<String>,
    pub plan: Option<String>,
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SetPlanRequest {
    pub plan: Plan,
}

#[derive(Debug, Serialize)]
pub struct AdminUserResponse {
    pub user: User,
    pub message: String,
}

fn parse_plan_filter(raw: Option<&str>) -> Result<Option<Plan>, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some("free") => Ok(Some(Plan::Free)),
        Some("paid") => Ok(Some(Plan::Paid)),
        Some(_) => Err(AppError::Validation(FieldErrors::single(
            "plan",
            "The plan must be one of all, free, paid.",
        ))),
    }
}

fn respond(user: User, message: String) -> Json<AdminUserResponse> {
    Json(AdminUserResponse { user, message })
}

/// GET /api/v1/admin
pub async fn handle_overview(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<AdminOverview>, AppError> {
    Ok(Json(plans::overview(state.store.as_ref()).await?))
}

/// GET /api/v1/admin/users?search=&plan=&page=
pub async fn handle_list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<UsersQuery>,
) -> Result<Json<UserPage>, AppError> {
    let plan = parse_plan_filter(query.plan.as_deref())?;
    let page = plans::list_users(state.store.as_ref(), query.search, plan, query.page).await?;
    Ok(Json(page))
}

/// PUT /api/v1/admin/users/:id/plan
pub async fn handle_set_plan(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SetPlanRequest>,
) -> Result<Json<AdminUserResponse>, AppError> {
    let user = plans::set_plan(state.store.as_ref(), id, request.plan).await?;
    let message = format!("{} is now on the {} plan.", user.name, user.plan.as_str());
    Ok(respond(user, message))
}

/// POST /api/v1/admin/users/:id/upgrade
pub async fn handle_upgrade(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AdminUserResponse>, AppError> {
    let user = plans::upgrade(state.store.as_ref(), id).await?;
    let message = format!("{} upgraded to the paid plan.", user.name);
    Ok(respond(user, message))
}

/// POST /api/v1/admin/users/:id/downgrade
pub async fn handle_downgrade(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AdminUserResponse>, AppError> {
    let user = plans::downgrade(state.store.as_ref(), id).await?;
    let message = format!("{} downgraded to the free plan.", user.name);
    Ok(respond(user, message))
}

/// POST /api/v1/admin/users/:id/reset-count
pub async fn handle_reset_count(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AdminUserResponse>, AppError> {
    let user = plans::reset_invoice_count(state.store.as_ref(), id).await?;
    let message = format!("Invoice counter for {} reset to 0.", user.name);
    Ok(respond(user, message))
}
