//! Invoice lifecycle: create, update, send, mark paid, delete.
//!
//! Status only moves forward (draft → sent → paid). Every operation takes the
//! acting user explicitly and runs the ownership guard before touching a row.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::ownership::{assert_owns, owned_or_reject};
use crate::errors::{AppError, FieldErrors};
use crate::invoices::quota::PlanInfo;
use crate::invoices::templates::{
    build_wa_link, format_rupiah, preset_templates, render_message, suggest_template,
    PresetTemplate, TemplateKey,
};
use crate::models::client::Client;
use crate::models::invoice::{Invoice, InvoiceFields, InvoiceStatus};
use crate::models::user::User;
use crate::store::{client_not_found, invoice_not_found, SendOutcome, Store};

pub const MIN_AMOUNT: i64 = 1_000;
const AMOUNT_SCALE: u32 = 2;

/// Largest value the `NUMERIC(15, 2)` amount column holds.
fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999_999, AMOUNT_SCALE)
}
const MAX_DESCRIPTION_CHARS: usize = 500;

// ────────────────────────────────────────────────────────────────────────────
// Request / response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceRequest {
    pub client_id: Option<String>,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    /// `YYYY-MM-DD`; empty or absent means no due date.
    pub due_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceListItem {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub client_name: Option<String>,
    pub client_whatsapp: Option<String>,
    pub formatted_amount: String,
}

impl InvoiceListItem {
    /// Joins `invoice` with its client from `clients`, keyed by client id.
    pub fn new(invoice: Invoice, clients: &HashMap<Uuid, Client>) -> Self {
        let client = clients.get(&invoice.client_id);
        InvoiceListItem {
            client_name: client.map(|c| c.client_name.clone()),
            client_whatsapp: client.map(|c| c.client_whatsapp.clone()),
            formatted_amount: format_rupiah(invoice.amount),
            invoice,
        }
    }
}

pub fn clients_by_id(clients: impl IntoIterator<Item = Client>) -> HashMap<Uuid, Client> {
    clients.into_iter().map(|c| (c.id, c)).collect()
}

#[derive(Debug, Serialize)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub client: Client,
    pub formatted_amount: String,
    pub days_until_due: Option<i64>,
    pub templates: Vec<PresetTemplate>,
    pub suggested_template: TemplateKey,
    /// The suggested template already filled for this invoice.
    pub suggested_message: String,
    pub plan: PlanInfo,
}

#[derive(Debug)]
pub struct SendReceipt {
    pub invoice: Invoice,
    /// False when the invoice was already sent or paid and nothing changed.
    pub transitioned: bool,
}

#[derive(Debug, Serialize)]
pub struct WaLink {
    pub link: String,
    pub message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

/// Checks field shapes, then that the referenced client exists and belongs to `actor`.
async fn resolve_fields(
    store: &dyn Store,
    actor: &User,
    request: InvoiceRequest,
) -> Result<InvoiceFields, AppError> {
    let mut errors = FieldErrors::new();

    let client_id = match request.client_id.as_deref().map(str::trim) {
        None | Some("") => {
            errors.add("client_id", "The client field is required.");
            None
        }
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                errors.add("client_id", "The selected client is invalid.");
                None
            }
        },
    };

    match request.amount {
        None => errors.add("amount", "The amount field is required."),
        Some(amount) if amount < Decimal::from(MIN_AMOUNT) => errors.add(
            "amount",
            format!("The amount must be at least {MIN_AMOUNT}."),
        ),
        Some(amount) if amount > max_amount() => errors.add(
            "amount",
            format!("The amount may not be greater than {}.", max_amount()),
        ),
        Some(amount) if amount.normalize().scale() > AMOUNT_SCALE => errors.add(
            "amount",
            format!("The amount may not have more than {AMOUNT_SCALE} decimal places."),
        ),
        Some(_) => {}
    }

    let description = request.description.unwrap_or_default().trim().to_string();
    if description.is_empty() {
        errors.add("description", "The description field is required.");
    } else if description.chars().count() > MAX_DESCRIPTION_CHARS {
        errors.add(
            "description",
            format!("The description may not be greater than {MAX_DESCRIPTION_CHARS} characters."),
        );
    }

    let due_date = match request.due_date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                errors.add("due_date", "The due date is not a valid date.");
                None
            }
        },
    };

    // The client lookup only makes sense once the id parsed.
    if let Some(id) = client_id {
        match store.find_client(id).await? {
            None => errors.add("client_id", "The selected client is invalid."),
            Some(client) => assert_owns(&client, actor)?,
        }
    }

    errors.into_result()?;

    match (client_id, request.amount) {
        (Some(client_id), Some(amount)) => Ok(InvoiceFields {
            client_id,
            amount,
            description,
            due_date,
        }),
        _ => Err(AppError::Internal(anyhow::anyhow!(
            "invoice fields passed validation without client or amount"
        ))),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Operations
// ────────────────────────────────────────────────────────────────────────────

pub async fn get_invoice(store: &dyn Store, actor: &User, id: Uuid) -> Result<Invoice, AppError> {
    owned_or_reject(store.find_invoice(id).await?, actor, || invoice_not_found(id))
}

/// Lists the actor's invoices, newest first, each joined with its client.
pub async fn list_invoices(
    store: &dyn Store,
    actor: &User,
    status: Option<InvoiceStatus>,
) -> Result<Vec<InvoiceListItem>, AppError> {
    let clients = clients_by_id(
        store
            .list_clients(actor.id)
            .await?
            .into_iter()
            .map(|summary| summary.client),
    );

    Ok(store
        .list_invoices(actor.id, status)
        .await?
        .into_iter()
        .map(|invoice| InvoiceListItem::new(invoice, &clients))
        .collect())
}

pub async fn create_invoice(
    store: &dyn Store,
    actor: &User,
    request: InvoiceRequest,
) -> Result<Invoice, AppError> {
    let fields = resolve_fields(store, actor, request).await?;
    let invoice = store.insert_invoice(actor.id, &fields).await?;
    info!("User {} created draft invoice {}", actor.id, invoice.id);
    Ok(invoice)
}

/// Replaces the editable fields. Allowed in every status; status, `sent_at`
/// and the send counter are untouched.
pub async fn update_invoice(
    store: &dyn Store,
    actor: &User,
    id: Uuid,
    request: InvoiceRequest,
) -> Result<Invoice, AppError> {
    get_invoice(store, actor, id).await?;
    let fields = resolve_fields(store, actor, request).await?;
    store.update_invoice(id, &fields).await
}

/// Moves a draft to sent, consuming one unit of the owner's quota.
///
/// Sent and paid invoices are a successful no-op. A free user at the limit
/// gets `QuotaExceeded` and nothing is written.
pub async fn send_invoice(
    store: &dyn Store,
    actor: &User,
    id: Uuid,
    free_limit: i32,
    now: DateTime<Utc>,
) -> Result<SendReceipt, AppError> {
    get_invoice(store, actor, id).await?;

    match store.send_invoice(id, free_limit, now).await? {
        SendOutcome::Sent {
            invoice,
            invoice_count,
        } => {
            info!(
                "User {} sent invoice {id} ({invoice_count} sent so far)",
                actor.id
            );
            Ok(SendReceipt {
                invoice,
                transitioned: true,
            })
        }
        SendOutcome::Unchanged(invoice) => Ok(SendReceipt {
            invoice,
            transitioned: false,
        }),
        SendOutcome::QuotaExceeded => {
            info!("User {} hit the free plan limit sending {id}", actor.id);
            Err(AppError::QuotaExceeded { limit: free_limit })
        }
    }
}

/// Marks the invoice paid from any status.
pub async fn mark_paid(store: &dyn Store, actor: &User, id: Uuid) -> Result<Invoice, AppError> {
    get_invoice(store, actor, id).await?;
    let invoice = store.mark_invoice_paid(id).await?;
    info!("User {} marked invoice {id} paid", actor.id);
    Ok(invoice)
}

pub async fn delete_invoice(store: &dyn Store, actor: &User, id: Uuid) -> Result<(), AppError> {
    get_invoice(store, actor, id).await?;
    store.delete_invoice(id).await?;
    info!("User {} deleted invoice {id}", actor.id);
    Ok(())
}

async fn invoice_with_client(
    store: &dyn Store,
    actor: &User,
    id: Uuid,
) -> Result<(Invoice, Client), AppError> {
    let invoice = get_invoice(store, actor, id).await?;
    let client = owned_or_reject(store.find_client(invoice.client_id).await?, actor, || {
        client_not_found(invoice.client_id)
    })?;
    Ok((invoice, client))
}

pub async fn invoice_detail(
    store: &dyn Store,
    actor: &User,
    id: Uuid,
    today: NaiveDate,
    free_limit: i32,
) -> Result<InvoiceDetail, AppError> {
    let (invoice, client) = invoice_with_client(store, actor, id).await?;
    let suggested_template = suggest_template(invoice.due_date, today);

    Ok(InvoiceDetail {
        formatted_amount: format_rupiah(invoice.amount),
        days_until_due: invoice.days_until_due(today),
        templates: preset_templates(),
        suggested_message: render_message(suggested_template.text(), &invoice, &client),
        suggested_template,
        plan: PlanInfo::for_user(actor, free_limit),
        invoice,
        client,
    })
}

/// Fills `message` for this invoice and wraps it in a `wa.me` link to the client.
pub async fn wa_link(
    store: &dyn Store,
    actor: &User,
    id: Uuid,
    message: &str,
) -> Result<WaLink, AppError> {
    if message.trim().is_empty() {
        return Err(AppError::Validation(FieldErrors::single(
            "message",
            "The message field is required.",
        )));
    }
    let (invoice, client) = invoice_with_client(store, actor, id).await?;
    let message = render_message(message, &invoice, &client);
    Ok(WaLink {
        link: build_wa_link(&message, &client.client_whatsapp),
        message,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
