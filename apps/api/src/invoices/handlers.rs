//! Axum route handlers for the Invoice API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractors::CurrentUser;
use crate::errors::{AppError, FieldErrors};
use crate::invoices::lifecycle::{
    self, InvoiceDetail, InvoiceListItem, InvoiceRequest, WaLink,
};
use crate::invoices::quota::PlanInfo;
use crate::models::invoice::{Invoice, InvoiceStatus};
use crate::state::AppState;
use crate::store::user_not_found;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceListResponse {
    pub invoices: Vec<InvoiceListItem>,
    pub status: String,
    pub plan: PlanInfo,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub invoice: Invoice,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub invoice: Invoice,
    pub message: String,
    pub plan: PlanInfo,
}

#[derive(Debug, Deserialize)]
pub struct WaLinkRequest {
    pub message: Option<String>,
}

/// `all` (or nothing) means no filter.
fn parse_status_filter(raw: Option<&str>) -> Result<Option<InvoiceStatus>, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => InvoiceStatus::parse(value).map(Some).ok_or_else(|| {
            AppError::Validation(FieldErrors::single(
                "status",
                "The status must be one of all, draft, sent, paid.",
            ))
        }),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/invoices?status=
pub async fn handle_list_invoices(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<StatusQuery>,
) -> Result<Json<InvoiceListResponse>, AppError> {
    let status = parse_status_filter(query.status.as_deref())?;
    let invoices = lifecycle::list_invoices(state.store.as_ref(), &user, status).await?;
    Ok(Json(InvoiceListResponse {
        invoices,
        status: query.status.unwrap_or_else(|| "all".to_string()),
        plan: PlanInfo::for_user(&user, state.config.free_invoice_limit),
    }))
}

/// POST /api/v1/invoices
pub async fn handle_create_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<InvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    let invoice = lifecycle::create_invoice(state.store.as_ref(), &user, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(InvoiceResponse {
            invoice,
            message: "Invoice created.".to_string(),
        }),
    ))
}

/// GET /api/v1/invoices/:id
///
/// Invoice with client, preset templates and the suggested one for its due date.
pub async fn handle_get_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceDetail>, AppError> {
    let detail = lifecycle::invoice_detail(
        state.store.as_ref(),
        &user,
        id,
        state.config.today(),
        state.config.free_invoice_limit,
    )
    .await?;
    Ok(Json(detail))
}

/// PUT /api/v1/invoices/:id
pub async fn handle_update_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<InvoiceRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = lifecycle::update_invoice(state.store.as_ref(), &user, id, request).await?;
    Ok(Json(InvoiceResponse {
        invoice,
        message: "Invoice updated.".to_string(),
    }))
}

/// DELETE /api/v1/invoices/:id
pub async fn handle_delete_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    lifecycle::delete_invoice(state.store.as_ref(), &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/invoices/:id/send
///
/// Quota denial comes back as 402 with an upgrade message.
pub async fn handle_send_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SendResponse>, AppError> {
    let limit = state.config.free_invoice_limit;
    let receipt =
        lifecycle::send_invoice(state.store.as_ref(), &user, id, limit, Utc::now()).await?;

    let user = state
        .store
        .find_user(user.id)
        .await?
        .ok_or_else(|| user_not_found(user.id))?;

    let message = if receipt.transitioned {
        "Invoice marked as sent."
    } else {
        "Invoice was already sent; nothing changed."
    };
    Ok(Json(SendResponse {
        invoice: receipt.invoice,
        message: message.to_string(),
        plan: PlanInfo::for_user(&user, limit),
    }))
}

/// POST /api/v1/invoices/:id/mark-paid
pub async fn handle_mark_paid(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = lifecycle::mark_paid(state.store.as_ref(), &user, id).await?;
    Ok(Json(InvoiceResponse {
        invoice,
        message: "Invoice marked as paid.".to_string(),
    }))
}

/// POST /api/v1/invoices/:id/wa-link
pub async fn handle_wa_link(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<WaLinkRequest>,
) -> Result<Json<WaLink>, AppError> {
    let message = request.message.unwrap_or_default();
    let link = lifecycle::wa_link(state.store.as_ref(), &user, id, &message).await?;
    Ok(Json(link))
}
