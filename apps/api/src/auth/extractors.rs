use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use chrono::Utc;

use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
///
/// Missing, unknown and expired sessions are all rejected with 401.
pub struct CurrentUser(pub User);

/// An authenticated caller with the admin flag. Non-admins get 403.
pub struct AdminUser(pub User);

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(&parts.headers)
            .ok_or(AppError::Unauthorized)?
            .to_string();

        let session = state
            .store
            .find_session(&token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if session.is_expired(Utc::now()) {
            state.store.delete_session(&token).await?;
            return Err(AppError::Unauthorized);
        }

        let user = state
            .store
            .find_user(session.user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}
