//! Route definitions for the schedule, events and rooms.

use axum::routing::get;
use axum::Router;

use crate::handlers::schedule;
use crate::state::AppState;

/// Routes merged at the `/api/v1` root.
///
/// ```text
/// GET /schedule              -> get_schedule
/// GET /events/{id}           -> get_event
/// GET /rooms                 -> list_rooms
/// GET /rooms/{id}            -> get_room
/// GET /rooms/{id}/schedule   -> get_room_schedule
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/schedule", get(schedule::get_schedule))
        .route("/events/{id}", get(schedule::get_event))
        .route("/rooms", get(schedule::list_rooms))
        .route("/rooms/{id}", get(schedule::get_room))
        .route("/rooms/{id}/schedule", get(schedule::get_room_schedule))
}
