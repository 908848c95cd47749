use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
}

impl InvoiceStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "draft" => Some(InvoiceStatus::Draft),
            "sent" => Some(InvoiceStatus::Sent),
            "paid" => Some(InvoiceStatus::Paid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: Uuid,
    pub amount: Decimal,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub status: InvoiceStatus,
    /// Set once, when the invoice leaves draft through a send.
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Whole days from `today` to the due date; negative once overdue.
    pub fn days_until_due(&self, today: NaiveDate) -> Option<i64> {
        self.due_date.map(|due| (due - today).num_days())
    }
}

/// Validated invoice fields, shared by create and update.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceFields {
    pub client_id: Uuid,
    pub amount: Decimal,
    pub description: String,
    pub due_date: Option<NaiveDate>,
}
