use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::extractors::CurrentUser;
use crate::clients::directory::{self, ClientRequest};
use crate::errors::AppError;
use crate::models::client::{Client, ClientSummary};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClientResponse {
    pub client: Client,
    pub message: String,
}

/// GET /api/v1/clients
pub async fn handle_list_clients(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ClientSummary>>, AppError> {
    Ok(Json(
        directory::list_clients(state.store.as_ref(), &user).await?,
    ))
}

/// POST /api/v1/clients
pub async fn handle_create_client(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<ClientRequest>,
) -> Result<(StatusCode, Json<ClientResponse>), AppError> {
    let client = directory::create_client(state.store.as_ref(), &user, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ClientResponse {
            client,
            message: "Client added.".to_string(),
        }),
    ))
}

/// GET /api/v1/clients/:id
pub async fn handle_get_client(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, AppError> {
    Ok(Json(
        directory::get_client(state.store.as_ref(), &user, id).await?,
    ))
}

/// PUT /api/v1/clients/:id
pub async fn handle_update_client(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ClientRequest>,
) -> Result<Json<ClientResponse>, AppError> {
    let client = directory::update_client(state.store.as_ref(), &user, id, request).await?;
    Ok(Json(ClientResponse {
        client,
        message: "Client updated.".to_string(),
    }))
}

/// DELETE /api/v1/clients/:id
pub async fn handle_delete_client(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    directory::delete_client(state.store.as_ref(), &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
