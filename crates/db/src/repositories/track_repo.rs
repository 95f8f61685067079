//! Repository for the `tracks` table.

use sqlx::PgPool;

use crate::models::track::{CreateTrack, Track};

/// Column list for tracks queries.
const COLUMNS: &str = "id, name, track_type, room_id";

/// Provides seeding inserts for tracks. Tracks are otherwise read through
/// the event join in [`EventRepo`](crate::repositories::EventRepo).
pub struct TrackRepo;

impl TrackRepo {
    /// Insert a new track.
    pub async fn create(pool: &PgPool, input: &CreateTrack) -> Result<Track, sqlx::Error> {
        let query = format!(
            "INSERT INTO tracks (name, track_type, room_id)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Track>(&query)
            .bind(&input.name)
            .bind(&input.track_type)
            .bind(input.room_id)
            .fetch_one(pool)
            .await
    }
}
