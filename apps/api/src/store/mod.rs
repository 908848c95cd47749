//! Persistence boundary.
//!
//! Every query the service issues goes through [`Store`], carried in `AppState`
//! as `Arc<dyn Store>`. `PgStore` is the production backend; tests run against
//! the in-memory `MemoryStore`.
//!
//! Ownership is not checked here. Callers resolve the entity, run it through
//! `auth::ownership::assert_owns`, and only then mutate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::client::{Client, ClientSummary};
use crate::models::invoice::{Invoice, InvoiceFields, InvoiceStatus};
use crate::models::session::Session;
use crate::models::user::{NewUser, Plan, PlanCounts, User, UserFilter, UserPage};

#[cfg(test)]
pub mod memory;
pub mod postgres;

/// Result of an atomic send attempt.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// Draft moved to sent; `invoice_count` is the owner's counter after the increment.
    Sent { invoice: Invoice, invoice_count: i32 },
    /// Invoice was already sent or paid. Nothing changed.
    Unchanged(Invoice),
    /// Owner is on the free plan and at the limit. Nothing changed.
    QuotaExceeded,
}

#[async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn insert_user(&self, new_user: NewUser) -> Result<User, AppError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn update_profile(
        &self,
        id: Uuid,
        name: &str,
        whatsapp_number: Option<&str>,
    ) -> Result<User, AppError>;
    /// Removes the user together with their sessions, clients, and invoices.
    async fn delete_user(&self, id: Uuid) -> Result<(), AppError>;
    async fn list_users(&self, filter: &UserFilter) -> Result<UserPage, AppError>;
    async fn recent_users(&self, limit: i64) -> Result<Vec<User>, AppError>;
    async fn plan_counts(&self) -> Result<PlanCounts, AppError>;
    async fn set_plan(&self, id: Uuid, plan: Plan) -> Result<Option<User>, AppError>;
    async fn reset_invoice_count(&self, id: Uuid) -> Result<Option<User>, AppError>;

    // Sessions
    async fn insert_session(&self, session: &Session) -> Result<(), AppError>;
    async fn find_session(&self, token: &str) -> Result<Option<Session>, AppError>;
    async fn delete_session(&self, token: &str) -> Result<(), AppError>;

    // Clients
    async fn insert_client(
        &self,
        user_id: Uuid,
        client_name: &str,
        client_whatsapp: &str,
    ) -> Result<Client, AppError>;
    async fn find_client(&self, id: Uuid) -> Result<Option<Client>, AppError>;
    async fn list_clients(&self, user_id: Uuid) -> Result<Vec<ClientSummary>, AppError>;
    async fn update_client(
        &self,
        id: Uuid,
        client_name: &str,
        client_whatsapp: &str,
    ) -> Result<Client, AppError>;
    /// Deletes the client and every invoice that references it.
    async fn delete_client(&self, id: Uuid) -> Result<(), AppError>;

    // Invoices
    async fn insert_invoice(&self, user_id: Uuid, fields: &InvoiceFields)
        -> Result<Invoice, AppError>;
    async fn find_invoice(&self, id: Uuid) -> Result<Option<Invoice>, AppError>;
    /// Newest first, optionally restricted to one status.
    async fn list_invoices(
        &self,
        user_id: Uuid,
        status: Option<InvoiceStatus>,
    ) -> Result<Vec<Invoice>, AppError>;
    async fn update_invoice(&self, id: Uuid, fields: &InvoiceFields) -> Result<Invoice, AppError>;
    async fn mark_invoice_paid(&self, id: Uuid) -> Result<Invoice, AppError>;
    async fn delete_invoice(&self, id: Uuid) -> Result<(), AppError>;
    /// Moves a draft to sent and bumps the owner's counter as one unit.
    ///
    /// The counter only moves when `plan = paid OR invoice_count < free_limit`
    /// holds at the moment of the write, so concurrent sends cannot overrun
    /// the free quota.
    async fn send_invoice(
        &self,
        id: Uuid,
        free_limit: i32,
        sent_at: DateTime<Utc>,
    ) -> Result<SendOutcome, AppError>;
}

pub(crate) fn invoice_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Invoice {id} not found"))
}

pub(crate) fn client_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Client {id} not found"))
}

pub(crate) fn user_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("User {id} not found"))
}
