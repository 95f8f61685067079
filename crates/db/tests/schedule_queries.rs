//! Integration tests for the schedule read path (events joined with tracks
//! and rooms).

use chrono::{TimeZone, Utc};
use ensemble_core::schedule::{events_in_room, group_into_time_slots};
use ensemble_core::types::{EntityId, Timestamp};
use ensemble_db::models::event::CreateEvent;
use ensemble_db::models::room::CreateRoom;
use ensemble_db::models::track::CreateTrack;
use ensemble_db::repositories::{EventRepo, RoomRepo, TrackRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn at(hour: u32, minute: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2025, 6, 14, hour, minute, 0).unwrap()
}

fn new_event(
    title: &str,
    start: Timestamp,
    end: Timestamp,
    track_id: Option<EntityId>,
) -> CreateEvent {
    CreateEvent {
        title: title.to_string(),
        description: None,
        event_type: "unconference".to_string(),
        start_time: start,
        end_time: end,
        facilitator: None,
        track_id,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn list_with_tracks_expands_track_and_room(pool: PgPool) {
    let room = RoomRepo::create(
        &pool,
        &CreateRoom {
            name: "Hall A".into(),
            room_type: "unconference".into(),
            capacity: Some(80),
        },
    )
    .await
    .unwrap();
    let track = TrackRepo::create(
        &pool,
        &CreateTrack {
            name: "Main".into(),
            track_type: "unconference".into(),
            room_id: Some(room.id),
        },
    )
    .await
    .unwrap();

    let talk_event = new_event("Talk", at(10, 0), at(10, 30), Some(track.id));
    EventRepo::create(&pool, &talk_event).await.unwrap();
    EventRepo::create(&pool, &new_event("Lunch", at(12, 0), at(13, 0), None))
        .await
        .unwrap();

    let events = EventRepo::list_with_tracks(&pool).await.unwrap();
    assert_eq!(events.len(), 2);

    let talk = &events[0];
    assert_eq!(talk.title, "Talk");
    let expanded_track = talk.track.as_ref().expect("track should be joined");
    assert_eq!(expanded_track.name, "Main");
    let expanded_room = expanded_track.room.as_ref().expect("room should be joined");
    assert_eq!(expanded_room.name, "Hall A");
    assert_eq!(expanded_room.capacity, Some(80));

    let lunch = &events[1];
    assert!(
        lunch.track.is_none(),
        "events without a track are still listed"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn list_with_tracks_is_ordered_by_start(pool: PgPool) {
    EventRepo::create(&pool, &new_event("Late", at(15, 0), at(16, 0), None))
        .await
        .unwrap();
    EventRepo::create(&pool, &new_event("Early", at(9, 0), at(10, 0), None))
        .await
        .unwrap();
    EventRepo::create(&pool, &new_event("Early too", at(9, 0), at(10, 0), None))
        .await
        .unwrap();

    let events = EventRepo::list_with_tracks(&pool).await.unwrap();
    let slots = group_into_time_slots(events);

    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].start_time, at(9, 0));
    assert_eq!(slots[0].events.len(), 2);
    assert_eq!(slots[1].events[0].title, "Late");
}

#[sqlx::test(migrations = "./migrations")]
async fn find_with_track_returns_none_for_unknown_id(pool: PgPool) {
    let found = EventRepo::find_with_track(&pool, uuid::Uuid::new_v4())
        .await
        .unwrap();
    assert!(found.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn room_filter_uses_track_room(pool: PgPool) {
    let hall = RoomRepo::create(
        &pool,
        &CreateRoom {
            name: "Hall".into(),
            room_type: "unconference".into(),
            capacity: None,
        },
    )
    .await
    .unwrap();
    let booths = RoomRepo::create(
        &pool,
        &CreateRoom {
            name: "Booths".into(),
            room_type: "booth_area".into(),
            capacity: None,
        },
    )
    .await
    .unwrap();
    let hall_track = TrackRepo::create(
        &pool,
        &CreateTrack {
            name: "Hall track".into(),
            track_type: "unconference".into(),
            room_id: Some(hall.id),
        },
    )
    .await
    .unwrap();
    let booth_track = TrackRepo::create(
        &pool,
        &CreateTrack {
            name: "Booth track".into(),
            track_type: "booth".into(),
            room_id: Some(booths.id),
        },
    )
    .await
    .unwrap();

    let hall_event = new_event("In hall", at(10, 0), at(11, 0), Some(hall_track.id));
    EventRepo::create(&pool, &hall_event).await.unwrap();
    let booth_event = new_event("At booth", at(10, 0), at(11, 0), Some(booth_track.id));
    EventRepo::create(&pool, &booth_event).await.unwrap();
    EventRepo::create(&pool, &new_event("Nowhere", at(10, 0), at(11, 0), None))
        .await
        .unwrap();

    let events = EventRepo::list_with_tracks(&pool).await.unwrap();
    let in_hall = events_in_room(events, hall.id);

    assert_eq!(in_hall.len(), 1);
    assert_eq!(in_hall[0].title, "In hall");
}

#[sqlx::test(migrations = "./migrations")]
async fn invalid_event_type_is_rejected(pool: PgPool) {
    let mut input = new_event("Bad", at(10, 0), at(11, 0), None);
    input.event_type = "party".into();

    let result = EventRepo::create(&pool, &input).await;
    assert!(result.is_err());
}
