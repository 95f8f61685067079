//! Repository for the `rooms` table.

use ensemble_core::types::EntityId;
use sqlx::PgPool;

use crate::models::room::{CreateRoom, Room};

/// Column list for rooms queries.
const COLUMNS: &str = "id, name, room_type, capacity";

/// Provides read access (and seeding inserts) for rooms.
pub struct RoomRepo;

impl RoomRepo {
    /// Insert a new room.
    pub async fn create(pool: &PgPool, input: &CreateRoom) -> Result<Room, sqlx::Error> {
        let query = format!(
            "INSERT INTO rooms (name, room_type, capacity)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Room>(&query)
            .bind(&input.name)
            .bind(&input.room_type)
            .bind(input.capacity)
            .fetch_one(pool)
            .await
    }

    /// Find a room by ID.
    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<Room>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rooms WHERE id = $1");
        sqlx::query_as::<_, Room>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all rooms ordered by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<Room>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rooms ORDER BY name ASC");
        sqlx::query_as::<_, Room>(&query).fetch_all(pool).await
    }
}
