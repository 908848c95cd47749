//! Registration, login sessions, and profile management.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::clients::phone::normalize_phone;
use crate::config::Config;
use crate::errors::{AppError, FieldErrors};
use crate::models::session::Session;
use crate::models::user::{NewUser, User};
use crate::store::Store;

const MAX_NAME_CHARS: usize = 255;
const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub whatsapp_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub whatsapp_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionGrant {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

fn validate_name(raw: Option<String>, errors: &mut FieldErrors) -> String {
    let name = raw.unwrap_or_default().trim().to_string();
    if name.is_empty() {
        errors.add("name", "The name field is required.");
    } else if name.chars().count() > MAX_NAME_CHARS {
        errors.add(
            "name",
            format!("The name may not be greater than {MAX_NAME_CHARS} characters."),
        );
    }
    name
}

fn optional_phone(raw: Option<String>) -> Option<String> {
    raw.map(|p| normalize_phone(&p)).filter(|p| !p.is_empty())
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Creates a free-plan account. The configured admin email gets the admin flag.
pub async fn register(
    store: &dyn Store,
    config: &Config,
    request: RegisterRequest,
) -> Result<User, AppError> {
    let mut errors = FieldErrors::new();
    let name = validate_name(request.name, &mut errors);

    let email = request.email.unwrap_or_default().trim().to_lowercase();
    if email.is_empty() {
        errors.add("email", "The email field is required.");
    } else if !looks_like_email(&email) || email.chars().count() > MAX_NAME_CHARS {
        errors.add("email", "The email must be a valid email address.");
    }

    let password = request.password.unwrap_or_default();
    if password.chars().count() < MIN_PASSWORD_CHARS {
        errors.add(
            "password",
            format!("The password must be at least {MIN_PASSWORD_CHARS} characters."),
        );
    }
    errors.into_result()?;

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.into()))??;

    let is_admin = config.admin_email.as_deref() == Some(email.as_str());
    let user = store
        .insert_user(NewUser {
            name,
            email,
            password_hash,
            whatsapp_number: optional_phone(request.whatsapp_number),
            is_admin,
        })
        .await?;

    info!("Registered user {} (admin: {is_admin})", user.id);
    Ok(user)
}

/// Opens a session for `user_id` valid for the configured TTL.
pub async fn issue_session(
    store: &dyn Store,
    user_id: Uuid,
    ttl_hours: i64,
) -> Result<Session, AppError> {
    let now = Utc::now();
    let session = Session {
        token: format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
        user_id,
        created_at: now,
        expires_at: now + Duration::hours(ttl_hours),
    };
    store.insert_session(&session).await?;
    Ok(session)
}

/// Checks credentials and opens a session. Any mismatch is `Unauthorized`.
pub async fn login(
    store: &dyn Store,
    config: &Config,
    request: LoginRequest,
) -> Result<SessionGrant, AppError> {
    let email = request.email.trim().to_lowercase();
    let user = store
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let hash = user.password_hash.clone();
    let password = request.password;
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.into()))??;
    if !valid {
        return Err(AppError::Unauthorized);
    }

    let session = issue_session(store, user.id, config.session_ttl_hours).await?;
    info!("User {} logged in", user.id);
    Ok(SessionGrant {
        token: session.token,
        expires_at: session.expires_at,
        user,
    })
}

pub async fn logout(store: &dyn Store, token: &str) -> Result<(), AppError> {
    store.delete_session(token).await
}

pub async fn update_profile(
    store: &dyn Store,
    actor: &User,
    request: ProfileRequest,
) -> Result<User, AppError> {
    let mut errors = FieldErrors::new();
    let name = validate_name(request.name, &mut errors);
    errors.into_result()?;

    let whatsapp_number = optional_phone(request.whatsapp_number);
    store
        .update_profile(actor.id, &name, whatsapp_number.as_deref())
        .await
}

/// Deletes the account with its sessions, clients and invoices.
pub async fn delete_account(store: &dyn Store, actor: &User) -> Result<(), AppError> {
    store.delete_user(actor.id).await?;
    info!("User {} deleted their account", actor.id);
    Ok(())
}
