//! Repository for the `events` table.
//!
//! Reads always join the event's track and the track's room so callers get
//! the expanded [`EventWithTrack`] shape.

use ensemble_core::types::EntityId;
use sqlx::PgPool;

use crate::models::event::{CreateEvent, Event, EventJoinRow, EventWithTrack};

/// Column list for plain events queries.
const COLUMNS: &str = "id, title, description, event_type, start_time, end_time, \
    facilitator, track_id";

/// Select list + joins producing an [`EventJoinRow`].
const JOINED_SELECT: &str = "SELECT e.id, e.title, e.description, e.event_type, \
        e.start_time, e.end_time, e.facilitator, e.track_id, \
        t.name AS track_name, t.track_type, t.room_id AS track_room_id, \
        r.id AS room_id, r.name AS room_name, r.room_type, r.capacity AS room_capacity \
    FROM events e \
    LEFT JOIN tracks t ON t.id = e.track_id \
    LEFT JOIN rooms r ON r.id = t.room_id";

/// Provides read access (and seeding inserts) for events.
pub struct EventRepo;

impl EventRepo {
    /// Insert a new event.
    pub async fn create(pool: &PgPool, input: &CreateEvent) -> Result<Event, sqlx::Error> {
        let query = format!(
            "INSERT INTO events
                (title, description, event_type, start_time, end_time, facilitator, track_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.event_type)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(&input.facilitator)
            .bind(input.track_id)
            .fetch_one(pool)
            .await
    }

    /// All events with track and room expanded, ascending by start time.
    ///
    /// Ties on start time are broken by end time then id so repeated reads
    /// of unchanged data return the same order.
    pub async fn list_with_tracks(pool: &PgPool) -> Result<Vec<EventWithTrack>, sqlx::Error> {
        let query = format!("{JOINED_SELECT} ORDER BY e.start_time ASC, e.end_time ASC, e.id ASC");
        let rows = sqlx::query_as::<_, EventJoinRow>(&query)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(EventWithTrack::from).collect())
    }

    /// Find one event with track and room expanded.
    pub async fn find_with_track(
        pool: &PgPool,
        id: EntityId,
    ) -> Result<Option<EventWithTrack>, sqlx::Error> {
        let query = format!("{JOINED_SELECT} WHERE e.id = $1");
        let row = sqlx::query_as::<_, EventJoinRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(EventWithTrack::from))
    }

    /// Delete an event by ID. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: EntityId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
