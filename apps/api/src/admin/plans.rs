//! Plan manager.
//!
//! These operations trust their caller to be an admin; the HTTP layer enforces
//! that through the `AdminUser` extractor before any of them run.

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{Plan, PlanCounts, User, UserFilter, UserPage};
use crate::store::{user_not_found, Store};

pub const USERS_PER_PAGE: i64 = 20;
pub const RECENT_USERS: i64 = 10;

#[derive(Debug, Serialize)]
pub struct AdminOverview {
    #[serde(flatten)]
    pub counts: PlanCounts,
    pub recent_users: Vec<User>,
}

pub async fn set_plan(store: &dyn Store, user_id: Uuid, plan: Plan) -> Result<User, AppError> {
    let user = store
        .set_plan(user_id, plan)
        .await?
        .ok_or_else(|| user_not_found(user_id))?;
    info!("User {user_id} moved to the {} plan", plan.as_str());
    Ok(user)
}

pub async fn upgrade(store: &dyn Store, user_id: Uuid) -> Result<User, AppError> {
    set_plan(store, user_id, Plan::Paid).await
}

pub async fn downgrade(store: &dyn Store, user_id: Uuid) -> Result<User, AppError> {
    set_plan(store, user_id, Plan::Free).await
}

/// Zeroes the sent-invoice counter. Plan and invoices are left alone.
pub async fn reset_invoice_count(store: &dyn Store, user_id: Uuid) -> Result<User, AppError> {
    let user = store
        .reset_invoice_count(user_id)
        .await?
        .ok_or_else(|| user_not_found(user_id))?;
    info!("Invoice counter reset for user {user_id}");
    Ok(user)
}

pub async fn overview(store: &dyn Store) -> Result<AdminOverview, AppError> {
    Ok(AdminOverview {
        counts: store.plan_counts().await?,
        recent_users: store.recent_users(RECENT_USERS).await?,
    })
}

/// One page of users, newest first. Pages are 1-based; anything lower is page 1.
pub async fn list_users(
    store: &dyn Store,
    search: Option<String>,
    plan: Option<Plan>,
    page: Option<i64>,
) -> Result<UserPage, AppError> {
    let filter = UserFilter {
        search: search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        plan,
        page: page.unwrap_or(1).max(1),
        per_page: USERS_PER_PAGE,
    };
    store.list_users(&filter).await
}
