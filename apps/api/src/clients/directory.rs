//! Ownership-scoped client CRUD.

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::ownership::owned_or_reject;
use crate::clients::phone::normalize_phone;
use crate::errors::{AppError, FieldErrors};
use crate::models::client::{Client, ClientSummary};
use crate::models::user::User;
use crate::store::{client_not_found, Store};

const MAX_NAME_CHARS: usize = 255;
const MAX_RAW_PHONE_CHARS: usize = 20;

#[derive(Debug, Default, Deserialize)]
pub struct ClientRequest {
    pub client_name: Option<String>,
    pub client_whatsapp: Option<String>,
}

/// Validated client input with the phone already normalized.
#[derive(Debug, PartialEq)]
pub struct ClientFields {
    pub client_name: String,
    pub client_whatsapp: String,
}

impl ClientRequest {
    pub fn validate(self) -> Result<ClientFields, AppError> {
        let mut errors = FieldErrors::new();

        let client_name = self.client_name.unwrap_or_default().trim().to_string();
        if client_name.is_empty() {
            errors.add("client_name", "The client name field is required.");
        } else if client_name.chars().count() > MAX_NAME_CHARS {
            errors.add(
                "client_name",
                format!("The client name may not be greater than {MAX_NAME_CHARS} characters."),
            );
        }

        let raw_phone = self.client_whatsapp.unwrap_or_default().trim().to_string();
        let client_whatsapp = normalize_phone(&raw_phone);
        if raw_phone.is_empty() {
            errors.add("client_whatsapp", "The WhatsApp number field is required.");
        } else if raw_phone.chars().count() > MAX_RAW_PHONE_CHARS {
            errors.add(
                "client_whatsapp",
                format!(
                    "The WhatsApp number may not be greater than {MAX_RAW_PHONE_CHARS} characters."
                ),
            );
        } else if client_whatsapp.is_empty() {
            errors.add("client_whatsapp", "The WhatsApp number must contain digits.");
        }

        errors.into_result()?;
        Ok(ClientFields {
            client_name,
            client_whatsapp,
        })
    }
}

pub async fn list_clients(store: &dyn Store, actor: &User) -> Result<Vec<ClientSummary>, AppError> {
    store.list_clients(actor.id).await
}

pub async fn get_client(store: &dyn Store, actor: &User, id: Uuid) -> Result<Client, AppError> {
    owned_or_reject(store.find_client(id).await?, actor, || client_not_found(id))
}

pub async fn create_client(
    store: &dyn Store,
    actor: &User,
    request: ClientRequest,
) -> Result<Client, AppError> {
    let fields = request.validate()?;
    let client = store
        .insert_client(actor.id, &fields.client_name, &fields.client_whatsapp)
        .await?;
    info!("User {} created client {}", actor.id, client.id);
    Ok(client)
}

pub async fn update_client(
    store: &dyn Store,
    actor: &User,
    id: Uuid,
    request: ClientRequest,
) -> Result<Client, AppError> {
    get_client(store, actor, id).await?;
    let fields = request.validate()?;
    store
        .update_client(id, &fields.client_name, &fields.client_whatsapp)
        .await
}

/// Deletes the client; its invoices go with it.
pub async fn delete_client(store: &dyn Store, actor: &User, id: Uuid) -> Result<(), AppError> {
    get_client(store, actor, id).await?;
    store.delete_client(id).await?;
    info!("User {} deleted client {id} and its invoices", actor.id);
    Ok(())
}
