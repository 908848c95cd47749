//! In-memory [`Store`] for tests. One mutex guards all tables, so every
//! operation, including the send check-and-increment, is atomic.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::invoices::quota::can_send;
use crate::models::client::{Client, ClientSummary};
use crate::models::invoice::{Invoice, InvoiceFields, InvoiceStatus};
use crate::models::session::Session;
use crate::models::user::{NewUser, Plan, PlanCounts, User, UserFilter, UserPage};
use crate::store::{client_not_found, invoice_not_found, user_not_found, SendOutcome, Store};

#[derive(Default)]
struct Tables {
    // Vecs keep insertion order; "newest first" is reverse order.
    users: Vec<User>,
    clients: Vec<Client>,
    invoices: Vec<Invoice>,
    sessions: HashMap<String, Session>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("memory store lock poisoned")))
    }
}

fn user_mut(tables: &mut Tables, id: Uuid) -> Option<&mut User> {
    tables.users.iter_mut().find(|u| u.id == id)
}

fn invoice_mut(tables: &mut Tables, id: Uuid) -> Option<&mut Invoice> {
    tables.invoices.iter_mut().find(|i| i.id == id)
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut tables = self.lock()?;
        if tables.users.iter().any(|u| u.email == new_user.email) {
            return Err(AppError::Conflict(format!(
                "Email {} is already registered",
                new_user.email
            )));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            whatsapp_number: new_user.whatsapp_number,
            plan: Plan::Free,
            invoice_count: 0,
            is_admin: new_user.is_admin,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.lock()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: &str,
        whatsapp_number: Option<&str>,
    ) -> Result<User, AppError> {
        let mut tables = self.lock()?;
        let user = user_mut(&mut tables, id).ok_or_else(|| user_not_found(id))?;
        user.name = name.to_string();
        user.whatsapp_number = whatsapp_number.map(str::to_string);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Err(user_not_found(id));
        }
        tables.sessions.retain(|_, s| s.user_id != id);
        tables.clients.retain(|c| c.user_id != id);
        tables.invoices.retain(|i| i.user_id != id);
        Ok(())
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<UserPage, AppError> {
        let tables = self.lock()?;
        let needle = filter
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let matching: Vec<&User> = tables
            .users
            .iter()
            .rev()
            .filter(|u| filter.plan.map_or(true, |p| u.plan == p))
            .filter(|u| {
                needle.as_deref().map_or(true, |n| {
                    u.name.to_lowercase().contains(n) || u.email.to_lowercase().contains(n)
                })
            })
            .collect();

        let per_page = filter.per_page.max(1);
        let page = filter.page.max(1);
        let users = matching
            .iter()
            .skip(((page - 1) * per_page) as usize)
            .take(per_page as usize)
            .map(|u| (*u).clone())
            .collect();

        Ok(UserPage {
            users,
            total: matching.len() as i64,
            page,
            per_page,
        })
    }

    async fn recent_users(&self, limit: i64) -> Result<Vec<User>, AppError> {
        Ok(self
            .lock()?
            .users
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn plan_counts(&self) -> Result<PlanCounts, AppError> {
        let tables = self.lock()?;
        let free_users = tables.users.iter().filter(|u| u.plan == Plan::Free).count() as i64;
        let paid_users = tables.users.iter().filter(|u| u.plan == Plan::Paid).count() as i64;
        Ok(PlanCounts {
            total_users: tables.users.len() as i64,
            free_users,
            paid_users,
        })
    }

    async fn set_plan(&self, id: Uuid, plan: Plan) -> Result<Option<User>, AppError> {
        let mut tables = self.lock()?;
        Ok(user_mut(&mut tables, id).map(|user| {
            user.plan = plan;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn reset_invoice_count(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let mut tables = self.lock()?;
        Ok(user_mut(&mut tables, id).map(|user| {
            user.invoice_count = 0;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        self.lock()?
            .sessions
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        Ok(self.lock()?.sessions.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<(), AppError> {
        self.lock()?.sessions.remove(token);
        Ok(())
    }

    async fn insert_client(
        &self,
        user_id: Uuid,
        client_name: &str,
        client_whatsapp: &str,
    ) -> Result<Client, AppError> {
        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4(),
            user_id,
            client_name: client_name.to_string(),
            client_whatsapp: client_whatsapp.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.lock()?.clients.push(client.clone());
        Ok(client)
    }

    async fn find_client(&self, id: Uuid) -> Result<Option<Client>, AppError> {
        Ok(self.lock()?.clients.iter().find(|c| c.id == id).cloned())
    }

    async fn list_clients(&self, user_id: Uuid) -> Result<Vec<ClientSummary>, AppError> {
        let tables = self.lock()?;
        Ok(tables
            .clients
            .iter()
            .rev()
            .filter(|c| c.user_id == user_id)
            .map(|c| ClientSummary {
                client: c.clone(),
                invoices_count: tables
                    .invoices
                    .iter()
                    .filter(|i| i.client_id == c.id)
                    .count() as i64,
            })
            .collect())
    }

    async fn update_client(
        &self,
        id: Uuid,
        client_name: &str,
        client_whatsapp: &str,
    ) -> Result<Client, AppError> {
        let mut tables = self.lock()?;
        let client = tables
            .clients
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| client_not_found(id))?;
        client.client_name = client_name.to_string();
        client.client_whatsapp = client_whatsapp.to_string();
        client.updated_at = Utc::now();
        Ok(client.clone())
    }

    async fn delete_client(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        let before = tables.clients.len();
        tables.clients.retain(|c| c.id != id);
        if tables.clients.len() == before {
            return Err(client_not_found(id));
        }
        tables.invoices.retain(|i| i.client_id != id);
        Ok(())
    }

    async fn insert_invoice(
        &self,
        user_id: Uuid,
        fields: &InvoiceFields,
    ) -> Result<Invoice, AppError> {
        let now = Utc::now();
        let invoice = Invoice {
            id: Uuid::new_v4(),
            user_id,
            client_id: fields.client_id,
            amount: fields.amount,
            description: fields.description.clone(),
            due_date: fields.due_date,
            status: InvoiceStatus::Draft,
            sent_at: None,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.invoices.push(invoice.clone());
        Ok(invoice)
    }

    async fn find_invoice(&self, id: Uuid) -> Result<Option<Invoice>, AppError> {
        Ok(self.lock()?.invoices.iter().find(|i| i.id == id).cloned())
    }

    async fn list_invoices(
        &self,
        user_id: Uuid,
        status: Option<InvoiceStatus>,
    ) -> Result<Vec<Invoice>, AppError> {
        Ok(self
            .lock()?
            .invoices
            .iter()
            .rev()
            .filter(|i| i.user_id == user_id)
            .filter(|i| status.map_or(true, |s| i.status == s))
            .cloned()
            .collect())
    }

    async fn update_invoice(&self, id: Uuid, fields: &InvoiceFields) -> Result<Invoice, AppError> {
        let mut tables = self.lock()?;
        let invoice = invoice_mut(&mut tables, id).ok_or_else(|| invoice_not_found(id))?;
        invoice.client_id = fields.client_id;
        invoice.amount = fields.amount;
        invoice.description = fields.description.clone();
        invoice.due_date = fields.due_date;
        invoice.updated_at = Utc::now();
        Ok(invoice.clone())
    }

    async fn mark_invoice_paid(&self, id: Uuid) -> Result<Invoice, AppError> {
        let mut tables = self.lock()?;
        let invoice = invoice_mut(&mut tables, id).ok_or_else(|| invoice_not_found(id))?;
        invoice.status = InvoiceStatus::Paid;
        invoice.updated_at = Utc::now();
        Ok(invoice.clone())
    }

    async fn delete_invoice(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        let before = tables.invoices.len();
        tables.invoices.retain(|i| i.id != id);
        if tables.invoices.len() == before {
            return Err(invoice_not_found(id));
        }
        Ok(())
    }

    async fn send_invoice(
        &self,
        id: Uuid,
        free_limit: i32,
        sent_at: DateTime<Utc>,
    ) -> Result<SendOutcome, AppError> {
        let mut tables = self.lock()?;
        let invoice = tables
            .invoices
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| invoice_not_found(id))?;

        if invoice.status != InvoiceStatus::Draft {
            return Ok(SendOutcome::Unchanged(invoice));
        }

        let owner = user_mut(&mut tables, invoice.user_id)
            .ok_or_else(|| user_not_found(invoice.user_id))?;
        if !can_send(owner, free_limit) {
            return Ok(SendOutcome::QuotaExceeded);
        }
        owner.invoice_count += 1;
        let invoice_count = owner.invoice_count;

        let invoice = invoice_mut(&mut tables, id).ok_or_else(|| invoice_not_found(id))?;
        invoice.status = InvoiceStatus::Sent;
        invoice.sent_at = Some(sent_at);
        invoice.updated_at = sent_at;

        Ok(SendOutcome::Sent {
            invoice: invoice.clone(),
            invoice_count,
        })
    }
}
