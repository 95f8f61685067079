//! Schedule event models.
//!
//! Events are read joined with their track and the track's room. The join
//! is fetched flat ([`EventJoinRow`]) and folded into the nested
//! [`EventWithTrack`] the API serves.

use ensemble_core::schedule::{RoomPlaced, Scheduled};
use ensemble_core::types::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::room::Room;
use crate::models::track::TrackWithRoom;

/// A row from the `events` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Event {
    pub id: EntityId,
    pub title: String,
    pub description: Option<String>,
    /// `anchor`, `unconference` or `booth`.
    pub event_type: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub facilitator: Option<String>,
    pub track_id: Option<EntityId>,
}

/// DTO for creating an event.
#[derive(Debug, Deserialize)]
pub struct CreateEvent {
    pub title: String,
    pub description: Option<String>,
    pub event_type: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub facilitator: Option<String>,
    pub track_id: Option<EntityId>,
}

/// An event with its track (and the track's room) expanded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventWithTrack {
    pub id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub event_type: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub facilitator: Option<String>,
    pub track: Option<TrackWithRoom>,
}

impl Scheduled for EventWithTrack {
    fn start_time(&self) -> Timestamp {
        self.start_time
    }

    fn end_time(&self) -> Timestamp {
        self.end_time
    }
}

impl RoomPlaced for EventWithTrack {
    /// The expanded room's id, falling back to the track's `room_id`.
    fn room_id(&self) -> Option<EntityId> {
        self.track
            .as_ref()
            .and_then(|track| track.room.as_ref().map(|room| room.id).or(track.room_id))
    }
}

/// Flat result of `events LEFT JOIN tracks LEFT JOIN rooms`.
#[derive(Debug, FromRow)]
pub struct EventJoinRow {
    pub id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub event_type: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub facilitator: Option<String>,
    pub track_id: Option<EntityId>,
    pub track_name: Option<String>,
    pub track_type: Option<String>,
    pub track_room_id: Option<EntityId>,
    pub room_id: Option<EntityId>,
    pub room_name: Option<String>,
    pub room_type: Option<String>,
    pub room_capacity: Option<i32>,
}

impl From<EventJoinRow> for EventWithTrack {
    fn from(row: EventJoinRow) -> Self {
        let room = match (row.room_id, row.room_name, row.room_type) {
            (Some(id), Some(name), Some(room_type)) => Some(Room {
                id,
                name,
                room_type,
                capacity: row.room_capacity,
            }),
            _ => None,
        };

        let track = match (row.track_id, row.track_name, row.track_type) {
            (Some(id), Some(name), Some(track_type)) => Some(TrackWithRoom {
                id,
                name,
                track_type,
                room_id: row.track_room_id,
                room,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            event_type: row.event_type,
            start_time: row.start_time,
            end_time: row.end_time,
            facilitator: row.facilitator,
            track,
        }
    }
}
