use ensemble_core::types::EntityId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `rooms` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Room {
    pub id: EntityId,
    pub name: String,
    /// `unconference` or `booth_area`.
    pub room_type: String,
    pub capacity: Option<i32>,
}

/// DTO for creating a room.
#[derive(Debug, Deserialize)]
pub struct CreateRoom {
    pub name: String,
    pub room_type: String,
    pub capacity: Option<i32>,
}
