//! Handlers for the schedule, event and room resources.
//!
//! All reads are public. Schedules are returned as a [`ScheduleView`]:
//! slots of events sharing an identical start/end pair, ordered by start.

use axum::extract::{Path, State};
use axum::Json;
use ensemble_core::error::CoreError;
use ensemble_core::schedule::{events_in_room, ScheduleView};
use ensemble_core::types::EntityId;
use ensemble_db::models::event::EventWithTrack;
use ensemble_db::models::room::Room;
use ensemble_db::repositories::{EventRepo, RoomRepo};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Fetch every event and aggregate it into time slots.
pub async fn load_schedule(pool: &PgPool) -> Result<ScheduleView<EventWithTrack>, sqlx::Error> {
    let events = EventRepo::list_with_tracks(pool).await?;
    Ok(ScheduleView::from_events(events))
}

/// GET /api/v1/schedule
pub async fn get_schedule(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<ScheduleView<EventWithTrack>>>> {
    let view = load_schedule(&state.pool).await?;
    Ok(Json(DataResponse { data: view }))
}

/// GET /api/v1/events/{id}
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<EntityId>,
) -> AppResult<Json<DataResponse<EventWithTrack>>> {
    let event = EventRepo::find_with_track(&state.pool, event_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Event", event_id)))?;

    Ok(Json(DataResponse { data: event }))
}

/// GET /api/v1/rooms
pub async fn list_rooms(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<Room>>>> {
    let rooms = RoomRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: rooms }))
}

/// GET /api/v1/rooms/{id}
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<EntityId>,
) -> AppResult<Json<DataResponse<Room>>> {
    let room = find_room(&state.pool, room_id).await?;
    Ok(Json(DataResponse { data: room }))
}

/// GET /api/v1/rooms/{id}/schedule
///
/// Only events whose track is placed in the room are included.
pub async fn get_room_schedule(
    State(state): State<AppState>,
    Path(room_id): Path<EntityId>,
) -> AppResult<Json<DataResponse<ScheduleView<EventWithTrack>>>> {
    find_room(&state.pool, room_id).await?;

    let events = EventRepo::list_with_tracks(&state.pool).await?;
    let view = ScheduleView::from_events(events_in_room(events, room_id));

    Ok(Json(DataResponse { data: view }))
}

async fn find_room(pool: &PgPool, room_id: EntityId) -> AppResult<Room> {
    RoomRepo::find_by_id(pool, room_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Room", room_id)))
}
