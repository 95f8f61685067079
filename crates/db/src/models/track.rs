use ensemble_core::types::EntityId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::room::Room;

/// A row from the `tracks` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Track {
    pub id: EntityId,
    pub name: String,
    /// `unconference` or `booth`.
    pub track_type: String,
    pub room_id: Option<EntityId>,
}

/// DTO for creating a track.
#[derive(Debug, Deserialize)]
pub struct CreateTrack {
    pub name: String,
    pub track_type: String,
    pub room_id: Option<EntityId>,
}

/// A track with its room expanded (absent when unassigned).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackWithRoom {
    pub id: EntityId,
    pub name: String,
    pub track_type: String,
    pub room_id: Option<EntityId>,
    pub room: Option<Room>,
}
