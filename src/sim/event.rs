//! Typed simulation events and the time-ordered event queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use super::car::Car;
use super::types::SpotId;

/// Kind of a scheduled event.
///
/// Declaration order is the tie-break precedence for events sharing a
/// timestamp: `StartCharging` is processed first, `Arrival` last, so a slot
/// freed by `StopCharging` is reallocated before a new arrival is considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    StartCharging,
    StopCharging,
    Departure,
    ExpectedDeparture,
    ExpectedStopCharging,
    EndSimulation,
    StableCycleCheck,
    SolarUpdate,
    Arrival,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::StartCharging => "StartCharging",
            Self::StopCharging => "StopCharging",
            Self::Departure => "Departure",
            Self::ExpectedDeparture => "ExpectedDeparture",
            Self::ExpectedStopCharging => "ExpectedStopCharging",
            Self::EndSimulation => "EndSimulation",
            Self::StableCycleCheck => "StableCycleCheck",
            Self::SolarUpdate => "SolarUpdate",
            Self::Arrival => "Arrival",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A time-stamped message for one spot, optionally carrying a car.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub time: f64,
    pub kind: EventKind,
    /// Target spot; facility-wide events use spot 0.
    pub spot: SpotId,
    pub car: Option<Car>,
}

impl Event {
    /// Creates a facility-wide event without a car.
    pub fn new(time: f64, kind: EventKind) -> Self {
        Self {
            time,
            kind,
            spot: 0,
            car: None,
        }
    }

    /// Creates an event for `spot` without a car.
    pub fn at_spot(time: f64, kind: EventKind, spot: SpotId) -> Self {
        Self {
            time,
            kind,
            spot,
            car: None,
        }
    }

    /// Creates an event for `spot` carrying `car`.
    pub fn with_car(time: f64, kind: EventKind, spot: SpotId, car: Car) -> Self {
        Self {
            time,
            kind,
            spot,
            car: Some(car),
        }
    }

    /// Total order used by the scheduler: time, then kind precedence.
    pub fn schedule_cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.kind.cmp(&other.kind))
    }
}

struct Scheduled {
    seq: u64,
    event: Event,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // BinaryHeap is a max-heap; reverse so the earliest event sits on top.
    fn cmp(&self, other: &Self) -> Ordering {
        self.event
            .schedule_cmp(&other.event)
            .then(self.seq.cmp(&other.seq))
            .reverse()
    }
}

/// Min-priority queue of events ordered by [`Event::schedule_cmp`].
///
/// Events equal in time and kind leave in insertion order.
///
/// # Examples
///
/// ```
/// use smart_charging_sim::sim::event::{Event, EventKind, EventQueue};
///
/// let mut queue = EventQueue::new();
/// queue.push(Event::new(10.0, EventKind::Arrival));
/// queue.push(Event::new(10.0, EventKind::StopCharging));
/// queue.push(Event::new(9.0, EventKind::Departure));
///
/// let kinds: Vec<_> = std::iter::from_fn(|| queue.pop_earliest())
///     .map(|e| e.kind)
///     .collect();
/// assert_eq!(
///     kinds,
///     vec![EventKind::Departure, EventKind::StopCharging, EventKind::Arrival]
/// );
/// ```
#[derive(Default)]
pub struct EventQueue {
    heap: BinaryHeap<Scheduled>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `event` at its own timestamp.
    pub fn push(&mut self, event: Event) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.heap.push(Scheduled { seq, event });
    }

    /// Removes and returns the earliest event, or `None` when empty.
    pub fn pop_earliest(&mut self) -> Option<Event> {
        self.heap.pop().map(|s| s.event)
    }

    /// Returns the earliest event without removing it.
    pub fn peek(&self) -> Option<&Event> {
        self.heap.peek().map(|s| &s.event)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(queue: &mut EventQueue) -> Vec<Event> {
        std::iter::from_fn(|| queue.pop_earliest()).collect()
    }

    #[test]
    fn kind_precedence_matches_declaration_order() {
        assert!(EventKind::StartCharging < EventKind::StopCharging);
        assert!(EventKind::StopCharging < EventKind::Departure);
        assert!(EventKind::EndSimulation < EventKind::StableCycleCheck);
        assert!(EventKind::SolarUpdate < EventKind::Arrival);
    }

    #[test]
    fn dequeues_by_time_then_kind() {
        let mut queue = EventQueue::new();
        queue.push(Event::at_spot(10.0, EventKind::StopCharging, 2));
        queue.push(Event::new(10.0, EventKind::Arrival));
        queue.push(Event::at_spot(9.0, EventKind::Departure, 1));

        let out = drain(&mut queue);
        assert_eq!(out.len(), 3);
        assert_eq!((out[0].time, out[0].kind), (9.0, EventKind::Departure));
        assert_eq!((out[1].time, out[1].kind), (10.0, EventKind::StopCharging));
        assert_eq!((out[2].time, out[2].kind), (10.0, EventKind::Arrival));
    }

    #[test]
    fn equal_events_leave_in_insertion_order() {
        let mut queue = EventQueue::new();
        for spot in 0..5 {
            queue.push(Event::at_spot(3.0, EventKind::StartCharging, spot));
        }
        let spots: Vec<_> = drain(&mut queue).iter().map(|e| e.spot).collect();
        assert_eq!(spots, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn empty_queue_returns_none() {
        let mut queue = EventQueue::new();
        assert!(queue.is_empty());
        assert!(queue.pop_earliest().is_none());
        assert!(queue.peek().is_none());
    }

    #[test]
    fn car_travels_with_event() {
        let mut queue = EventQueue::new();
        let car = Car::new(1.0, 5.0, 2.0);
        queue.push(Event::with_car(1.0, EventKind::StartCharging, 4, car));
        let event = queue.pop_earliest();
        assert_eq!(event.and_then(|e| e.car), Some(car));
    }
}
