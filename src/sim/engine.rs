//! Discrete-event engine that runs one simulation under a single policy.

use tracing::{debug, info, warn};

use crate::error::SimError;
use crate::input::InputSource;

use super::accounting::{LoadSample, PerformanceMeasures, PerformanceReport};
use super::car::Car;
use super::event::{Event, EventKind, EventQueue};
use super::network::Topology;
use super::policy::Policy;
use super::state::FacilityState;
use super::tariff::choose_start_time;
use super::types::{HOURS_PER_DAY, SPOT_COUNT, SimConfig, SpotId};

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub policy: Policy,
    pub report: PerformanceReport,
    /// Cable loads at every recomputation of the measurement window, if recorded.
    pub trace: Vec<LoadSample>,
    /// Time at which the end-of-simulation event was processed.
    pub end_time: f64,
    pub events_processed: u64,
}

/// Simulation engine owning the facility, the event queue and the accounting
/// of one run.
///
/// Generic over `I: InputSource` for static dispatch, so a seeded random
/// source and a scripted one drive the same code.
pub struct Engine<I: InputSource> {
    config: SimConfig,
    policy: Policy,
    topology: Topology,
    state: FacilityState,
    events: EventQueue,
    accounting: PerformanceMeasures,
    input: I,
    now: f64,
    end_scheduled: bool,
    finished: bool,
    events_processed: u64,
}

impl<I: InputSource> Engine<I> {
    /// Creates an engine and schedules the initial events.
    ///
    /// # Arguments
    ///
    /// * `config` - Run configuration
    /// * `policy` - Charging policy applied to every arrival
    /// * `input` - Source of arrivals, demand, solar and spot choices
    pub fn new(config: SimConfig, policy: Policy, mut input: I) -> Self {
        let mut events = EventQueue::new();
        events.push(Event::new(config.check_interval, EventKind::StableCycleCheck));
        events.push(Event::new(0.0, EventKind::SolarUpdate));
        let first = input.arrival_gap(0.0);
        if first.is_finite() {
            events.push(Event::new(first, EventKind::Arrival));
        }

        Self {
            topology: Topology::standard(config.charging_rate_kw),
            state: FacilityState::new(&config),
            accounting: PerformanceMeasures::new(
                0.0,
                config.report_threshold_kw,
                config.record_load_trace,
            ),
            config,
            policy,
            events,
            input,
            now: 0.0,
            end_scheduled: false,
            finished: false,
            events_processed: 0,
        }
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn state(&self) -> &FacilityState {
        &self.state
    }

    pub fn accounting(&self) -> &PerformanceMeasures {
        &self.accounting
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Timestamp of the next event to be processed.
    pub fn next_event_time(&self) -> Option<f64> {
        self.events.peek().map(|e| e.time)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Adds an event to the queue; it is processed in timestamp order.
    pub fn schedule(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Runs until the end-of-simulation event has been processed.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EmptyEventQueue`] if the queue runs dry first,
    /// [`SimError::MissingCar`] for a malformed event and, in strict mode,
    /// [`SimError::InvariantViolation`] on the first inconsistent state.
    pub fn run(&mut self) -> Result<RunOutcome, SimError> {
        while !self.finished {
            self.step()?;
        }

        let report = self.accounting.report(self.now);
        info!(
            policy = %self.policy,
            end_time = self.now,
            events = self.events_processed,
            cars = report.cars_arrived,
            non_served = report.non_served,
            "run finished"
        );

        Ok(RunOutcome {
            policy: self.policy,
            report,
            trace: self.accounting.trace().to_vec(),
            end_time: self.now,
            events_processed: self.events_processed,
        })
    }

    /// Processes the earliest pending event.
    ///
    /// Returns the kind of the processed event, or `None` once the run has
    /// finished.
    ///
    /// # Errors
    ///
    /// See [`Engine::run`].
    pub fn step(&mut self) -> Result<Option<EventKind>, SimError> {
        if self.finished {
            return Ok(None);
        }
        let event = self
            .events
            .pop_earliest()
            .ok_or(SimError::EmptyEventQueue { time: self.now })?;
        self.now = event.time;
        self.events_processed += 1;
        let kind = event.kind;
        debug!(time = self.now, kind = %kind, spot = event.spot, "dispatch");

        self.dispatch(event)?;
        self.check_invariants()?;
        Ok(Some(kind))
    }

    fn dispatch(&mut self, event: Event) -> Result<(), SimError> {
        let Event {
            kind, spot, car, ..
        } = event;
        match kind {
            EventKind::Arrival => self.on_arrival(),
            EventKind::StartCharging => self.on_start_charging(spot, car)?,
            EventKind::StopCharging => self.on_stop_charging(spot, car)?,
            EventKind::Departure => self.on_departure(spot, car),
            EventKind::SolarUpdate => self.on_solar_update(),
            EventKind::StableCycleCheck => self.on_stable_cycle_check(),
            EventKind::EndSimulation => self.on_end(),
            // Reserved kinds: ordered like the others but change no state.
            EventKind::ExpectedDeparture | EventKind::ExpectedStopCharging => {}
        }
        Ok(())
    }

    fn check_invariants(&mut self) -> Result<(), SimError> {
        if let Err(detail) = self.state.validate() {
            if self.config.strict {
                return Err(SimError::InvariantViolation {
                    time: self.now,
                    detail,
                });
            }
            warn!(time = self.now, %detail, "facility invariant violated");
            self.accounting.invariant_violations += 1;
        }
        Ok(())
    }

    fn refresh_loads(&mut self) {
        self.state.refresh_loads(&self.topology, self.now);
        self.accounting.record_loads(&self.state, self.now);
    }

    /// First ranked spot with a free space, if any.
    fn choose_spot(&mut self) -> Option<SpotId> {
        self.input
            .rank_spots()
            .into_iter()
            .find(|&spot| self.state.has_space(spot))
    }

    fn can_charge(&self, spot: SpotId, charging: &[u32; SPOT_COUNT]) -> bool {
        self.topology.can_charge_without_overload(
            spot,
            charging,
            self.state.solar_kw(),
            self.config.admission_threshold_kw,
        )
    }

    fn on_arrival(&mut self) {
        let now = self.now;
        let gap = self.input.arrival_gap(now);
        if gap.is_finite() {
            self.events.push(Event::new(now + gap, EventKind::Arrival));
            self.accounting.record_arrival(gap);
        } else {
            self.accounting.record_arrival(0.0);
        }

        let Some(spot) = self.choose_spot() else {
            debug!(time = now, "no space at any preferred spot");
            self.accounting.record_non_served();
            return;
        };

        let charge = self.input.charging_time();
        let connection = self.input.connection_time(charge);
        let car = Car::new(now, connection, charge);
        self.state.occupy(spot);
        self.accounting.record_served();

        match self.policy {
            Policy::Immediate => {
                self.state.start_charging(spot);
                self.accounting.start_charging += 1;
                self.refresh_loads();
                self.events
                    .push(Event::with_car(now + charge, EventKind::StopCharging, spot, car));
                self.events
                    .push(Event::with_car(now + connection, EventKind::Departure, spot, car));
            }
            Policy::Fcfs | Policy::EarliestFeasible => {
                if self.can_charge(spot, &self.state.channel_counts()) {
                    self.events
                        .push(Event::with_car(now, EventKind::StartCharging, spot, car));
                } else {
                    let priority = self.policy.priority_of(&car);
                    self.state.queue_mut(spot).push(car, priority);
                }
            }
            Policy::PriceDriven => {
                let start = choose_start_time(now, charge, connection);
                self.events
                    .push(Event::with_car(start, EventKind::StartCharging, spot, car));
                self.events.push(Event::with_car(
                    start + charge,
                    EventKind::StopCharging,
                    spot,
                    car,
                ));
                self.events.push(Event::with_car(
                    car.planned_departure(),
                    EventKind::Departure,
                    spot,
                    car,
                ));
            }
        }
    }

    fn on_start_charging(&mut self, spot: SpotId, car: Option<Car>) -> Result<(), SimError> {
        if self.policy.uses_queues() {
            let car = car.ok_or(SimError::MissingCar {
                kind: EventKind::StartCharging.name(),
                spot,
            })?;
            self.events.push(Event::with_car(
                self.now + car.charge_remaining(),
                EventKind::StopCharging,
                spot,
                car,
            ));
        }
        self.state.start_charging(spot);
        self.accounting.start_charging += 1;
        self.refresh_loads();
        Ok(())
    }

    fn on_stop_charging(&mut self, spot: SpotId, car: Option<Car>) -> Result<(), SimError> {
        self.state.stop_charging(spot);
        self.accounting.stop_charging += 1;
        self.refresh_loads();

        if self.policy.uses_queues() {
            let car = car.ok_or(SimError::MissingCar {
                kind: EventKind::StopCharging.name(),
                spot,
            })?;
            let departure = car.planned_departure().max(self.now);
            self.events
                .push(Event::with_car(departure, EventKind::Departure, spot, car));
            self.drain_queues();
        }
        Ok(())
    }

    fn on_departure(&mut self, spot: SpotId, car: Option<Car>) {
        self.state.release(spot);
        if let Some(car) = car {
            self.accounting.record_departure(&car, self.now);
        }
    }

    fn on_solar_update(&mut self) {
        let solar = self.input.solar_yield(self.now, self.state.summer());
        self.state.set_solar_yield(solar);
        self.events
            .push(Event::new(self.now + 1.0, EventKind::SolarUpdate));
        self.refresh_loads();
        if self.policy.uses_queues() {
            self.drain_queues();
        }
    }

    fn on_stable_cycle_check(&mut self) {
        if self.end_scheduled {
            return;
        }
        let now = self.now;

        if now > self.config.max_time_without_steady_cycle() {
            warn!(time = now, policy = %self.policy, "no steady cycle reached, ending run");
            self.accounting.restart(now);
            self.events.push(Event::new(now, EventKind::EndSimulation));
            self.end_scheduled = true;
            return;
        }

        if self.state.is_stable(now, self.config.stability_tolerance) {
            let day = (now / HOURS_PER_DAY).floor() as u32;
            self.accounting.restart(now);
            self.accounting.steady_cycle_day = Some(day);
            self.events
                .push(Event::new(now + self.config.runtime, EventKind::EndSimulation));
            self.end_scheduled = true;
            info!(time = now, day, policy = %self.policy, "steady cycle reached");
        } else {
            self.events.push(Event::new(
                now + self.config.check_interval,
                EventKind::StableCycleCheck,
            ));
        }
    }

    fn on_end(&mut self) {
        self.refresh_loads();
        self.finished = true;
    }

    /// Spot whose queue head has the smallest priority value, skipping
    /// `excluded` spots. Ties go to the lowest spot index.
    fn most_urgent_queue(&self, excluded: &[bool; SPOT_COUNT]) -> Option<SpotId> {
        let mut best: Option<(f64, SpotId)> = None;
        for spot in 0..SPOT_COUNT {
            if excluded[spot] {
                continue;
            }
            let Some(priority) = self.state.queue(spot).head_priority() else {
                continue;
            };
            if best.is_none_or(|(p, _)| priority < p) {
                best = Some((priority, spot));
            }
        }
        best.map(|(_, spot)| spot)
    }

    /// Starts as many queued cars as the network allows.
    ///
    /// Repeatedly takes the most urgent queue and admits its head if one more
    /// channel adds no overload, counting the admissions of this pass; a spot
    /// that fails the test is excluded until the next pass. Every iteration
    /// either admits or excludes, so the pass terminates.
    ///
    /// Returns the number of cars scheduled to start charging now.
    pub fn drain_queues(&mut self) -> usize {
        let mut excluded = [false; SPOT_COUNT];
        let mut hypothetical = self.state.channel_counts();
        let mut admitted = 0;

        while let Some(spot) = self.most_urgent_queue(&excluded) {
            if !self.can_charge(spot, &hypothetical) {
                excluded[spot] = true;
                continue;
            }
            if let Some(car) = self.state.queue_mut(spot).pop() {
                self.events
                    .push(Event::with_car(self.now, EventKind::StartCharging, spot, car));
                hypothetical[spot] += 1;
                admitted += 1;
            }
        }

        if admitted > 0 {
            debug!(time = self.now, admitted, "started cars from queues");
        }
        admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ScriptedInput;

    fn config(runtime: f64) -> SimConfig {
        let mut cfg = SimConfig::new(runtime);
        cfg.strict = true;
        cfg
    }

    fn engine(policy: Policy, input: ScriptedInput) -> Engine<ScriptedInput> {
        Engine::new(config(48.0), policy, input)
    }

    #[test]
    fn initial_events_are_scheduled() {
        let input = ScriptedInput::new().arrival(0.5, 1.0, 2.0, [0, 1, 2]);
        let e = engine(Policy::Immediate, input);
        assert_eq!(e.pending_events(), 3);
        assert_eq!(e.now(), 0.0);
    }

    #[test]
    fn solar_update_comes_first_then_arrival() {
        let input = ScriptedInput::new().arrival(0.0, 1.0, 2.0, [0, 1, 2]);
        let mut e = engine(Policy::Immediate, input);
        assert_eq!(e.step().unwrap(), Some(EventKind::SolarUpdate));
        assert_eq!(e.step().unwrap(), Some(EventKind::Arrival));
        assert_eq!(e.state().charging(0), 1);
        assert_eq!(e.state().occupied(0), 1);
    }

    fn step_until(e: &mut Engine<ScriptedInput>, until: f64) {
        while e.next_event_time().is_some_and(|t| t <= until) {
            e.step().unwrap();
        }
    }

    #[test]
    fn immediate_car_charges_then_departs() {
        let input = ScriptedInput::new().arrival(0.25, 1.0, 2.0, [2, 1, 0]);
        let mut e = engine(Policy::Immediate, input);

        step_until(&mut e, 0.5);
        assert_eq!(e.state().occupied(2), 1);
        assert_eq!(e.state().charging(2), 1);
        assert_eq!(e.state().total_occupied(), 1);

        step_until(&mut e, 1.5);
        assert_eq!(e.state().occupied(2), 1);
        assert_eq!(e.state().charging(2), 0);

        step_until(&mut e, 3.0);
        assert_eq!(e.state().occupied(2), 0);
        assert_eq!(e.accounting().start_charging, 1);
        assert_eq!(e.accounting().stop_charging, 1);
        assert_eq!(e.accounting().delayed_cars, 0);
    }

    #[test]
    fn car_takes_first_ranked_spot_with_space() {
        let mut cfg = config(48.0);
        cfg.capacities[4] = 0;
        let input = ScriptedInput::new()
            .arrival(0.5, 1.0, 5.0, [4, 5, 6])
            .arrival(0.6, 1.0, 5.0, [6, 5, 4]);
        let mut e = Engine::new(cfg, Policy::Fcfs, input);

        step_until(&mut e, 1.0);
        assert_eq!(e.state().occupied(4), 0);
        assert_eq!(e.state().occupied(5), 1);
        assert_eq!(e.state().occupied(6), 1);
        assert_eq!(e.state().occupied(0), 0);
    }

    #[test]
    fn full_spots_make_car_non_served() {
        let mut cfg = config(48.0);
        cfg.capacities = [1, 0, 0, 0, 0, 0, 1];
        let input = ScriptedInput::new()
            .arrival(0.5, 1.0, 5.0, [0, 1, 2])
            .arrival(0.6, 4.0, 9.0, [0, 1, 2])
            .arrival(0.7, 2.0, 3.0, [6, 5, 4]);
        let mut e = Engine::new(cfg, Policy::Fcfs, input);

        step_until(&mut e, 1.0);
        assert_eq!(e.accounting().cars_arrived, 3);
        assert_eq!(e.accounting().cars_served, 2);
        assert_eq!(e.accounting().non_served, 1);
        assert_eq!(e.state().occupied(0), 1);
        assert_eq!(e.state().occupied(6), 1);

        // The car at spot 6 keeps its own times, not the turned-away car's.
        step_until(&mut e, 2.6);
        assert_eq!(e.state().charging(6), 1);
        step_until(&mut e, 2.8);
        assert_eq!(e.state().charging(6), 0);
        assert_eq!(e.state().occupied(6), 1);
        step_until(&mut e, 3.8);
        assert_eq!(e.state().occupied(6), 0);
    }

    #[test]
    fn fcfs_queues_when_network_is_full_and_drains_on_stop() {
        let mut cfg = config(48.0);
        cfg.admission_threshold_kw = 6.0;
        let input = ScriptedInput::new()
            .arrival(1.0, 2.0, 10.0, [0, 1, 2])
            .arrival(1.5, 1.0, 10.0, [0, 1, 2]);
        let mut e = Engine::new(cfg, Policy::Fcfs, input);

        while e.now() < 1.5 || e.state().queued_cars() == 0 {
            e.step().unwrap();
        }
        assert_eq!(e.state().charging(0), 1);
        assert_eq!(e.state().queue(0).len(), 1);

        // First car stops at 3.0; the queued car starts at the same instant.
        while e.now() < 3.0 || e.state().charging(0) == 0 {
            e.step().unwrap();
        }
        assert_eq!(e.now(), 3.0);
        assert_eq!(e.state().queued_cars(), 0);
        assert_eq!(e.state().charging(0), 1);
    }

    #[test]
    fn drain_respects_priority_across_spots() {
        let mut cfg = config(48.0);
        // P1 and P2 share junction A; allow only one more channel there.
        cfg.admission_threshold_kw = 6.0;
        let mut e = Engine::new(cfg, Policy::Fcfs, ScriptedInput::new());
        e.state.occupy(0);
        e.state.occupy(1);
        e.state.queue_mut(0).push(Car::new(5.0, 10.0, 1.0), 5.0);
        e.state.queue_mut(1).push(Car::new(2.0, 10.0, 1.0), 2.0);

        assert_eq!(e.drain_queues(), 1);
        assert_eq!(e.state().queue(1).len(), 0);
        assert_eq!(e.state().queue(0).len(), 1);
    }

    #[test]
    fn drain_bounded_by_queue_length() {
        let mut e = Engine::new(config(48.0), Policy::EarliestFeasible, ScriptedInput::new());
        for i in 0..4 {
            e.state.occupy(3);
            e.state
                .queue_mut(3)
                .push(Car::new(i as f64, 5.0, 1.0), 4.0 - i as f64);
        }
        assert_eq!(e.drain_queues(), 4);
        assert_eq!(e.drain_queues(), 0);
    }

    #[test]
    fn stop_charging_without_car_is_an_error() {
        let mut e = Engine::new(config(48.0), Policy::Fcfs, ScriptedInput::new());
        e.state.occupy(0);
        e.state.start_charging(0);
        e.schedule(Event::at_spot(0.0, EventKind::StopCharging, 0));
        let err = e.step().unwrap_err();
        assert!(matches!(err, SimError::MissingCar { spot: 0, .. }));
    }

    #[test]
    fn strict_mode_aborts_on_violation() {
        let mut e = Engine::new(config(48.0), Policy::Immediate, ScriptedInput::new());
        e.schedule(Event::at_spot(0.0, EventKind::Departure, 4));
        let err = e.step().unwrap_err();
        assert!(matches!(err, SimError::InvariantViolation { .. }));
    }

    #[test]
    fn lenient_mode_counts_violations() {
        let mut cfg = config(48.0);
        cfg.strict = false;
        let mut e = Engine::new(cfg, Policy::Immediate, ScriptedInput::new());
        e.schedule(Event::at_spot(0.0, EventKind::Departure, 4));
        e.step().unwrap();
        assert_eq!(e.accounting().invariant_violations, 1);
    }

    #[test]
    fn idle_run_is_cut_off_without_steady_cycle() {
        let mut e = Engine::new(config(10.0), Policy::Fcfs, ScriptedInput::new());
        let outcome = e.run().unwrap();
        assert!(outcome.report.steady_cycle_day.is_none());
        assert_eq!(outcome.end_time, 48.0);
        assert_eq!(outcome.report.window, 0.0);
        assert!(e.is_finished());
        assert_eq!(e.step().unwrap(), None);
    }

    #[test]
    fn reserved_kinds_change_nothing() {
        let mut e = Engine::new(config(48.0), Policy::Fcfs, ScriptedInput::new());
        e.schedule(Event::at_spot(0.0, EventKind::ExpectedDeparture, 1));
        e.schedule(Event::at_spot(0.0, EventKind::ExpectedStopCharging, 1));
        e.step().unwrap();
        e.step().unwrap();
        assert_eq!(e.state().total_occupied(), 0);
        assert_eq!(e.state().total_charging(), 0);
    }
}
