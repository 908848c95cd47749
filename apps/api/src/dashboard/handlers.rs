use axum::{extract::State, Json};
use serde::Serialize;

use crate::auth::extractors::CurrentUser;
use crate::dashboard::{compute_dashboard, DashboardSummary};
use crate::errors::AppError;
use crate::invoices::quota::PlanInfo;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub summary: DashboardSummary,
    pub plan: PlanInfo,
}

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<DashboardResponse>, AppError> {
    let clients: Vec<_> = state
        .store
        .list_clients(user.id)
        .await?
        .into_iter()
        .map(|summary| summary.client)
        .collect();
    let invoices = state.store.list_invoices(user.id, None).await?;
    let summary = compute_dashboard(&clients, &invoices, state.config.today());
    Ok(Json(DashboardResponse {
        summary,
        plan: PlanInfo::for_user(&user, state.config.free_invoice_limit),
    }))
}
