//! Axum route handlers for accounts and sessions.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::auth::accounts::{
    self, LoginRequest, ProfileRequest, RegisterRequest, SessionGrant,
};
use crate::auth::extractors::{bearer_token, CurrentUser};
use crate::errors::AppError;
use crate::invoices::quota::PlanInfo;
use crate::invoices::templates::format_rupiah;
use crate::models::user::User;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub plan: PlanInfo,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UpgradeInfo {
    pub plan: PlanInfo,
    pub price: i64,
    pub formatted_price: String,
    pub bank_account: Option<String>,
}

/// POST /api/v1/auth/register
///
/// Creates the account and signs it in.
pub async fn handle_register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionGrant>), AppError> {
    let user = accounts::register(state.store.as_ref(), &state.config, request).await?;
    let session =
        accounts::issue_session(state.store.as_ref(), user.id, state.config.session_ttl_hours)
            .await?;
    Ok((
        StatusCode::CREATED,
        Json(SessionGrant {
            token: session.token,
            expires_at: session.expires_at,
            user,
        }),
    ))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionGrant>, AppError> {
    let grant = accounts::login(state.store.as_ref(), &state.config, request).await?;
    Ok(Json(grant))
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token = bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    accounts::logout(state.store.as_ref(), token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/me
pub async fn handle_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<MeResponse> {
    let plan = PlanInfo::for_user(&user, state.config.free_invoice_limit);
    Json(MeResponse { user, plan })
}

/// PATCH /api/v1/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = accounts::update_profile(state.store.as_ref(), &user, request).await?;
    Ok(Json(ProfileResponse {
        user,
        message: "Profile updated.".to_string(),
    }))
}

/// DELETE /api/v1/profile
pub async fn handle_delete_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, AppError> {
    accounts::delete_account(state.store.as_ref(), &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/upgrade
///
/// Paid plan price and manual transfer details. Plan changes themselves are
/// applied by an admin after the transfer is confirmed.
pub async fn handle_upgrade_info(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<UpgradeInfo> {
    let price = state.config.upgrade_price;
    Json(UpgradeInfo {
        plan: PlanInfo::for_user(&user, state.config.free_invoice_limit),
        price,
        formatted_price: format_rupiah(Decimal::from(price)),
        bank_account: state.config.upgrade_bank_account.clone(),
    })
}
