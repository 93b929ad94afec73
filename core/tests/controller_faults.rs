//! Fail-soft controller handling: errors and panics never stop a round,
//! their commands are discarded, and their time is still charged.

use std::time::Duration;
use supervisor_core::{
    clock::ManualWallClock,
    command::CommandBuffer,
    controller::Controller,
    engine::{RoundLoop, RoundPhase},
    error::ControllerFault,
    event::RoundEvent,
    sensor::SensorReadings,
    types::SimTime,
};

/// Fails every `every`-th call; otherwise does nothing.
struct Flaky {
    every: u32,
    calls: u32,
}

impl Controller for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    fn control(
        &mut self,
        _dt: SimTime,
        _robot: &mut CommandBuffer,
        _readings: &SensorReadings,
    ) -> Result<(), ControllerFault> {
        self.calls += 1;
        if self.calls % self.every == 0 {
            return Err(ControllerFault::new(format!("call {} failed", self.calls)));
        }
        Ok(())
    }
}

/// Panics on its third call.
struct Panicky {
    calls: u32,
}

impl Controller for Panicky {
    fn name(&self) -> &str {
        "panicky"
    }

    fn control(
        &mut self,
        _dt: SimTime,
        _robot: &mut CommandBuffer,
        _readings: &SensorReadings,
    ) -> Result<(), ControllerFault> {
        self.calls += 1;
        if self.calls == 3 {
            panic!("index out of bounds in user code");
        }
        Ok(())
    }
}

/// Commands an over-limit torque, then reports failure (or not).
struct TorqueThenFail {
    fail: bool,
}

impl Controller for TorqueThenFail {
    fn name(&self) -> &str {
        "torque-then-fail"
    }

    fn control(
        &mut self,
        _dt: SimTime,
        robot: &mut CommandBuffer,
        _readings: &SensorReadings,
    ) -> Result<(), ControllerFault> {
        let mut torque = vec![0.0; robot.joint_count()];
        torque[2] = 80.0;
        robot.set_torque(&torque);
        if self.fail {
            return Err(ControllerFault::new("gave up after commanding"));
        }
        Ok(())
    }
}

/// Burns wall-clock time and then fails.
struct SlowAndBroken {
    clock: ManualWallClock,
}

impl Controller for SlowAndBroken {
    fn name(&self) -> &str {
        "slow-and-broken"
    }

    fn control(
        &mut self,
        _dt: SimTime,
        _robot: &mut CommandBuffer,
        _readings: &SensorReadings,
    ) -> Result<(), ControllerFault> {
        self.clock.advance(Duration::from_millis(100));
        Err(ControllerFault::new("timeout talking to planner"))
    }
}

fn faults(events: &[RoundEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            RoundEvent::ControllerFaulted { message, .. } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn controller_errors_are_logged_and_survived() {
    let mut round = RoundLoop::build_test(
        "flaky".into(),
        2,
        Box::new(Flaky { every: 3, calls: 0 }),
    )
    .unwrap();
    let events = round.run_ticks(30).unwrap();

    assert_eq!(faults(&events).len(), 10, "Every third call fails");
    assert_eq!(round.clock.current_tick, 30, "Faults must not stop the round");
    assert_eq!(round.score(), 0.0, "A fault carries no score by itself");

    let run_id = round.run_id.clone();
    assert_eq!(round.store().event_count_by_type(&run_id, "controller_faulted").unwrap(), 10);
}

#[test]
fn fault_time_matches_the_logged_time() {
    let mut round = RoundLoop::build_test(
        "fault-time".into(),
        2,
        Box::new(Flaky { every: 3, calls: 0 }),
    )
    .unwrap();
    round.run_ticks(3).unwrap();

    let run_id = round.run_id.clone();
    let entry = round
        .store()
        .events_for_tick(&run_id, 3)
        .unwrap()
        .into_iter()
        .find(|e| e.event_type == "controller_faulted")
        .expect("fault logged on tick 3");
    let event: RoundEvent = serde_json::from_str(&entry.payload).unwrap();
    let RoundEvent::ControllerFaulted { time, .. } = event else {
        panic!("wrong payload: {}", entry.payload);
    };

    // Stamped after the physics step, like every other event of the tick.
    assert!((time - entry.sim_time).abs() < 1e-12, "Event time {time} vs column {}", entry.sim_time);
    assert!((time - round.sim_time()).abs() < 1e-12);
    assert!((time - 0.06).abs() < 1e-9, "Expected the post-step time, got {time}");
}

#[test]
fn controller_panics_become_faults() {
    let mut round = RoundLoop::build_test("panicky".into(), 2, Box::new(Panicky { calls: 0 })).unwrap();
    let events = round.run_ticks(10).unwrap();

    let messages = faults(&events);
    assert_eq!(messages.len(), 1);
    assert!(
        messages[0].contains("index out of bounds in user code"),
        "Panic message lost: {}",
        messages[0]
    );
    assert_eq!(round.clock.current_tick, 10);
    assert_eq!(round.phase(), RoundPhase::Running);
}

#[test]
fn faulted_controller_commands_are_discarded() {
    let mut failing = RoundLoop::build_test(
        "discarded".into(),
        2,
        Box::new(TorqueThenFail { fail: true }),
    )
    .unwrap();
    failing.run_ticks(5).unwrap();
    assert_eq!(failing.score(), 0.0, "A failed call's torque must never reach the robot");

    let mut healthy = RoundLoop::build_test(
        "applied".into(),
        2,
        Box::new(TorqueThenFail { fail: false }),
    )
    .unwrap();
    let events = healthy.run_ticks(1).unwrap();
    assert!(
        events.iter().any(|e| matches!(e, RoundEvent::TorqueLimitViolated { dof: 2, .. })),
        "The same command from a healthy call must be applied, got {events:?}"
    );
}

#[test]
fn failing_calls_still_spend_the_budget() {
    let clock = ManualWallClock::new();
    let mut round = RoundLoop::build_test(
        "slow-and-broken".into(),
        2,
        Box::new(SlowAndBroken { clock: clock.clone() }),
    )
    .unwrap()
    .with_wall_clock(Box::new(clock));
    let events = round.run_ticks(60).unwrap();

    assert!(events.iter().any(|e| matches!(e, RoundEvent::Forfeited { .. })));
    assert!(round.supervisor().is_forfeited());
}
