//! Mutable facility state shared by every event handler of one run.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::car::Car;
use super::network::{NetworkLoad, Topology};
use super::types::{SPOT_COUNT, SimConfig, SpotId};

struct Waiting {
    priority: f64,
    seq: u64,
    car: Car,
}

impl PartialEq for Waiting {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Waiting {}

impl PartialOrd for Waiting {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Waiting {
    // Smallest priority value first; ties keep insertion order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then(self.seq.cmp(&other.seq))
            .reverse()
    }
}

/// Cars parked at a spot waiting for a charging channel.
///
/// Lower priority values are served first.
#[derive(Default)]
pub struct WaitingQueue {
    heap: BinaryHeap<Waiting>,
    next_seq: u64,
}

impl WaitingQueue {
    pub fn push(&mut self, car: Car, priority: f64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Waiting { priority, seq, car });
    }

    /// Priority value of the car at the head of the queue.
    pub fn head_priority(&self) -> Option<f64> {
        self.heap.peek().map(|w| w.priority)
    }

    pub fn pop(&mut self) -> Option<Car> {
        self.heap.pop().map(|w| w.car)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// Integrates active channels per day to decide when warm-up has decayed.
#[derive(Debug, Clone, Default)]
struct StabilityHistory {
    last_update: f64,
    channels: f64,
    current_window: f64,
    previous_window: Option<f64>,
}

impl StabilityHistory {
    fn advance(&mut self, now: f64, channels: f64) {
        let dt = (now - self.last_update).max(0.0);
        self.current_window += self.channels * dt;
        self.last_update = now;
        self.channels = channels;
    }

    fn close_window(&mut self, tolerance: f64) -> bool {
        let current = self.current_window;
        let stable = match self.previous_window {
            Some(prev) if prev > 0.0 => (current - prev).abs() <= tolerance * prev,
            _ => false,
        };
        self.previous_window = Some(current);
        self.current_window = 0.0;
        stable
    }
}

/// Occupancy, queues, solar input and cable loads of the facility.
///
/// Invariant: for every spot `capacity >= occupied >= charging >= 0`.
pub struct FacilityState {
    capacities: [u32; SPOT_COUNT],
    occupied: [i64; SPOT_COUNT],
    charging: [i64; SPOT_COUNT],
    queues: Vec<WaitingQueue>,
    solar_installed: [f64; SPOT_COUNT],
    solar_kw: [f64; SPOT_COUNT],
    summer: bool,
    load: NetworkLoad,
    previous_load: NetworkLoad,
    history: StabilityHistory,
}

impl FacilityState {
    /// Creates an empty facility from the run configuration.
    pub fn new(config: &SimConfig) -> Self {
        Self {
            capacities: config.capacities,
            occupied: [0; SPOT_COUNT],
            charging: [0; SPOT_COUNT],
            queues: (0..SPOT_COUNT).map(|_| WaitingQueue::default()).collect(),
            solar_installed: config.solar_installed,
            solar_kw: [0.0; SPOT_COUNT],
            summer: config.summer,
            load: NetworkLoad::zero(),
            previous_load: NetworkLoad::zero(),
            history: StabilityHistory::default(),
        }
    }

    pub fn summer(&self) -> bool {
        self.summer
    }

    pub fn capacity(&self, spot: SpotId) -> u32 {
        self.capacities[spot]
    }

    pub fn occupied(&self, spot: SpotId) -> i64 {
        self.occupied[spot]
    }

    pub fn charging(&self, spot: SpotId) -> i64 {
        self.charging[spot]
    }

    /// Returns `true` when `spot` still has a free physical space.
    pub fn has_space(&self, spot: SpotId) -> bool {
        self.occupied[spot] < i64::from(self.capacities[spot])
    }

    pub fn occupy(&mut self, spot: SpotId) {
        self.occupied[spot] += 1;
    }

    pub fn release(&mut self, spot: SpotId) {
        self.occupied[spot] -= 1;
    }

    pub fn start_charging(&mut self, spot: SpotId) {
        self.charging[spot] += 1;
    }

    pub fn stop_charging(&mut self, spot: SpotId) {
        self.charging[spot] -= 1;
    }

    /// Active channel counts in the form the network model consumes.
    pub fn channel_counts(&self) -> [u32; SPOT_COUNT] {
        self.charging.map(|c| u32::try_from(c).unwrap_or(0))
    }

    pub fn total_charging(&self) -> i64 {
        self.charging.iter().sum()
    }

    pub fn total_occupied(&self) -> i64 {
        self.occupied.iter().sum()
    }

    pub fn queue(&self, spot: SpotId) -> &WaitingQueue {
        &self.queues[spot]
    }

    pub fn queue_mut(&mut self, spot: SpotId) -> &mut WaitingQueue {
        &mut self.queues[spot]
    }

    pub fn queued_cars(&self) -> usize {
        self.queues.iter().map(WaitingQueue::len).sum()
    }

    pub fn solar_kw(&self) -> &[f64; SPOT_COUNT] {
        &self.solar_kw
    }

    /// Scales the facility-wide solar yield by each spot's installed panels.
    pub fn set_solar_yield(&mut self, yield_kw: f64) {
        for (solar, installed) in self.solar_kw.iter_mut().zip(self.solar_installed) {
            *solar = installed * yield_kw;
        }
    }

    pub fn load(&self) -> &NetworkLoad {
        &self.load
    }

    pub fn previous_load(&self) -> &NetworkLoad {
        &self.previous_load
    }

    /// Recomputes cable loads at `now`, keeping the old vector as the previous one.
    pub fn refresh_loads(&mut self, topology: &Topology, now: f64) {
        self.history.advance(now, self.total_charging() as f64);
        let load = topology.compute(&self.channel_counts(), &self.solar_kw);
        self.previous_load = std::mem::replace(&mut self.load, load);
    }

    /// Closes the current observation window and reports whether the charging
    /// activity in it stayed within `tolerance` of the previous window.
    pub fn is_stable(&mut self, now: f64, tolerance: f64) -> bool {
        self.history.advance(now, self.total_charging() as f64);
        self.history.close_window(tolerance)
    }

    /// Checks the occupancy invariants of every spot.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        for spot in 0..SPOT_COUNT {
            let (occ, chg) = (self.occupied[spot], self.charging[spot]);
            let cap = i64::from(self.capacities[spot]);
            if chg < 0 {
                return Err(format!("P{}: negative charging count {chg}", spot + 1));
            }
            if occ < chg {
                return Err(format!(
                    "P{}: occupied {occ} below charging {chg}",
                    spot + 1
                ));
            }
            if occ > cap {
                return Err(format!("P{}: occupied {occ} above capacity {cap}", spot + 1));
            }
        }
        Ok(())
    }
}
