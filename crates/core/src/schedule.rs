//! Time-slot aggregation for the event schedule.
//!
//! Events are bucketed by their exact `(start, end)` pair. Buckets keep the
//! order in which their events were encountered and slots appear in the order
//! their key was first seen, so a start-ordered input yields start-ordered
//! slots. [`sort_slots_by_start`] makes that ordering explicit for callers
//! that cannot vouch for their input.
//!
//! This module lives in `core` (zero internal deps) so the API layer, the
//! live schedule feed and any future tooling share one grouping rule.

use indexmap::IndexMap;
use serde::Serialize;

use crate::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Anything that occupies a fixed time range on the schedule.
pub trait Scheduled {
    fn start_time(&self) -> Timestamp;
    fn end_time(&self) -> Timestamp;
}

/// Anything that may be located in a room (directly or through its track).
pub trait RoomPlaced {
    /// The room the item takes place in, if known.
    fn room_id(&self) -> Option<EntityId>;
}

// ---------------------------------------------------------------------------
// TimeSlot
// ---------------------------------------------------------------------------

/// All events sharing one identical `(start_time, end_time)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSlot<E> {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub events: Vec<E>,
}

/// Group events into time slots keyed by their exact start/end pair.
///
/// Every input event lands in exactly one slot; events are never dropped,
/// whatever their track or room data looks like. Empty input yields an
/// empty vector.
pub fn group_into_time_slots<E, I>(events: I) -> Vec<TimeSlot<E>>
where
    E: Scheduled,
    I: IntoIterator<Item = E>,
{
    let mut buckets: IndexMap<(Timestamp, Timestamp), Vec<E>> = IndexMap::new();

    for event in events {
        let key = (event.start_time(), event.end_time());
        buckets.entry(key).or_default().push(event);
    }

    buckets
        .into_iter()
        .map(|((start_time, end_time), events)| TimeSlot {
            start_time,
            end_time,
            events,
        })
        .collect()
}

/// Stable-sort slots by start time.
///
/// Slots with equal start times keep their first-seen order.
pub fn sort_slots_by_start<E>(slots: &mut [TimeSlot<E>]) {
    slots.sort_by_key(|slot| slot.start_time);
}

/// Keep only the events that take place in `room_id`.
///
/// Events whose room cannot be determined are excluded.
pub fn events_in_room<E, I>(events: I, room_id: EntityId) -> Vec<E>
where
    E: RoomPlaced,
    I: IntoIterator<Item = E>,
{
    events
        .into_iter()
        .filter(|event| event.room_id() == Some(room_id))
        .collect()
}

// ---------------------------------------------------------------------------
// ScheduleView
// ---------------------------------------------------------------------------

/// Render-ready schedule: ordered slots plus an explicit empty flag.
///
/// `is_empty` is the "nothing scheduled" state; clients must not treat an
/// empty schedule as an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleView<E> {
    pub slots: Vec<TimeSlot<E>>,
    pub is_empty: bool,
}

impl<E: Scheduled> ScheduleView<E> {
    /// Group `events` and order the slots by start time.
    pub fn from_events<I>(events: I) -> Self
    where
        I: IntoIterator<Item = E>,
    {
        let mut slots = group_into_time_slots(events);
        sort_slots_by_start(&mut slots);
        let is_empty = slots.is_empty();
        Self { slots, is_empty }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u32,
        start: Timestamp,
        end: Timestamp,
        room: Option<EntityId>,
    }

    impl Scheduled for Item {
        fn start_time(&self) -> Timestamp {
            self.start
        }
        fn end_time(&self) -> Timestamp {
            self.end
        }
    }

    impl RoomPlaced for Item {
        fn room_id(&self) -> Option<EntityId> {
            self.room
        }
    }

    fn at(hour: u32, minute: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2025, 6, 14, hour, minute, 0).unwrap()
    }

    fn item(id: u32, start: (u32, u32), end: (u32, u32)) -> Item {
        Item {
            id,
            start: at(start.0, start.1),
            end: at(end.0, end.1),
            room: None,
        }
    }

    fn ids<E>(slot: &TimeSlot<E>, id: impl Fn(&E) -> u32) -> Vec<u32> {
        slot.events.iter().map(id).collect()
    }

    #[test]
    fn groups_identical_ranges_into_one_slot() {
        let events = vec![
            item(1, (10, 0), (10, 30)),
            item(2, (10, 0), (10, 30)),
            item(3, (11, 0), (11, 30)),
        ];

        let slots = group_into_time_slots(events);

        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start_time, at(10, 0));
        assert_eq!(slots[0].end_time, at(10, 30));
        assert_eq!(ids(&slots[0], |e| e.id), vec![1, 2]);
        assert_eq!(slots[1].start_time, at(11, 0));
        assert_eq!(ids(&slots[1], |e| e.id), vec![3]);
    }

    #[test]
    fn empty_input_yields_no_slots() {
        let slots = group_into_time_slots(Vec::<Item>::new());
        assert!(slots.is_empty());

        let view = ScheduleView::from_events(Vec::<Item>::new());
        assert!(view.is_empty);
        assert!(view.slots.is_empty());
    }

    #[test]
    fn same_start_different_end_are_distinct_slots() {
        let events = vec![item(1, (9, 0), (9, 30)), item(2, (9, 0), (10, 0))];
        let slots = group_into_time_slots(events);
        assert_eq!(slots.len(), 2);
    }

    #[test]
    fn slot_order_follows_first_appearance() {
        let events = vec![
            item(1, (14, 0), (15, 0)),
            item(2, (9, 0), (10, 0)),
            item(3, (14, 0), (15, 0)),
        ];

        let slots = group_into_time_slots(events);

        assert_eq!(slots[0].start_time, at(14, 0));
        assert_eq!(ids(&slots[0], |e| e.id), vec![1, 3]);
        assert_eq!(slots[1].start_time, at(9, 0));
    }

    #[test]
    fn sort_by_start_is_stable() {
        let events = vec![
            item(1, (14, 0), (15, 0)),
            item(2, (9, 0), (10, 0)),
            item(3, (9, 0), (9, 45)),
        ];

        let mut slots = group_into_time_slots(events);
        sort_slots_by_start(&mut slots);

        let order: Vec<u32> = slots.iter().map(|s| s.events[0].id).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn flattening_slots_returns_every_event_once() {
        let events: Vec<Item> = (0..20)
            .map(|i| item(i, (9 + i % 4, 0), (9 + i % 4, 30 + i % 3 * 10)))
            .collect();

        let slots = group_into_time_slots(events.clone());

        let mut flattened: Vec<u32> = slots
            .iter()
            .flat_map(|s| s.events.iter().map(|e| e.id))
            .collect();
        flattened.sort_unstable();
        assert_eq!(flattened, (0..20).collect::<Vec<_>>());

        let distinct: std::collections::HashSet<_> =
            events.iter().map(|e| (e.start, e.end)).collect();
        assert_eq!(slots.len(), distinct.len());
    }

    #[test]
    fn aggregation_is_idempotent() {
        let events = vec![
            item(1, (10, 0), (11, 0)),
            item(2, (12, 0), (13, 0)),
            item(3, (10, 0), (11, 0)),
        ];

        let first = group_into_time_slots(events.clone());
        let second = group_into_time_slots(events);
        assert_eq!(first, second);
    }

    #[test]
    fn events_in_room_filters_by_resolved_room() {
        let room = uuid::Uuid::new_v4();
        let other = uuid::Uuid::new_v4();

        let mut a = item(1, (10, 0), (11, 0));
        a.room = Some(room);
        let mut b = item(2, (10, 0), (11, 0));
        b.room = Some(other);
        let c = item(3, (10, 0), (11, 0));

        let kept = events_in_room(vec![a, b, c], room);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 1);
    }
}
