use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_name: String,
    /// Digits only, international form (`62...`).
    pub client_whatsapp: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A client row plus how many invoices reference it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ClientSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub client: Client,
    pub invoices_count: i64,
}
