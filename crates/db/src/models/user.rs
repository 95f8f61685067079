use ensemble_core::types::{EntityId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table. Only anonymous identities exist today.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: EntityId,
    pub is_anonymous: bool,
    pub created_at: Timestamp,
}
