use uuid::Uuid;

use crate::errors::AppError;
use crate::models::client::Client;
use crate::models::invoice::Invoice;
use crate::models::user::User;

/// Rows that belong to exactly one user.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

impl Owned for Client {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

impl Owned for Invoice {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

/// Rejects with `Forbidden` unless `actor` owns `entity`.
pub fn assert_owns<T: Owned>(entity: &T, actor: &User) -> Result<(), AppError> {
    if entity.owner_id() == actor.id {
        Ok(())
    } else {
        tracing::warn!("User {} denied access to a row owned by {}", actor.id, entity.owner_id());
        Err(AppError::Forbidden)
    }
}

/// Unwraps a lookup result and applies [`assert_owns`] in one step.
pub fn owned_or_reject<T: Owned>(
    entity: Option<T>,
    actor: &User,
    not_found: impl FnOnce() -> AppError,
) -> Result<T, AppError> {
    let entity = entity.ok_or_else(not_found)?;
    assert_owns(&entity, actor)?;
    Ok(entity)
}
