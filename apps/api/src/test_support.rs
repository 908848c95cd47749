//! Fixtures shared by the in-module tests.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::Config;
use crate::models::client::Client;
use crate::models::invoice::{Invoice, InvoiceFields};
use crate::models::user::{NewUser, Plan, User};
use crate::state::AppState;
use crate::store::memory::MemoryStore;
use crate::store::Store;

pub fn memory_state() -> AppState {
    AppState {
        store: Arc::new(MemoryStore::new()),
        config: Config::for_tests(),
    }
}

pub async fn seed_user(store: &dyn Store, plan: Plan) -> User {
    let id = Uuid::new_v4();
    let user = store
        .insert_user(NewUser {
            name: format!("User {id}"),
            email: format!("{id}@invokit.test"),
            password_hash: String::new(),
            whatsapp_number: None,
            is_admin: false,
        })
        .await
        .unwrap();
    match plan {
        Plan::Free => user,
        Plan::Paid => store.set_plan(user.id, Plan::Paid).await.unwrap().unwrap(),
    }
}

pub async fn seed_client(store: &dyn Store, owner: &User) -> Client {
    store
        .insert_client(owner.id, "Budi Santoso", "628123456789")
        .await
        .unwrap()
}

pub async fn seed_invoice(
    store: &dyn Store,
    owner: &User,
    client: &Client,
    due_date: Option<NaiveDate>,
) -> Invoice {
    store
        .insert_invoice(
            owner.id,
            &InvoiceFields {
                client_id: client.id,
                amount: Decimal::from(5_000_000),
                description: "Desain logo".to_string(),
                due_date,
            },
        )
        .await
        .unwrap()
}

pub async fn reload_user(store: &dyn Store, user: &User) -> User {
    store.find_user(user.id).await.unwrap().unwrap()
}
