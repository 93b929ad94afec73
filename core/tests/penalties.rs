//! Controller time budget: warnings, forfeiture and the frozen score.
//!
//! Latency is simulated with a ManualWallClock shared between the round
//! loop and the controller, so every tick costs exactly what we say.

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

/// Spends a fixed amount of wall-clock time on every call.
struct SlowController {
    clock:   ManualWallClock,
    latency: Duration,
}

impl Controller for SlowController {
    fn name(&self) -> &str {
        "slow"
    }

    fn control(
        &mut self,
        _dt: SimTime,
        _robot: &mut CommandBuffer,
        _readings: &SensorReadings,
    ) -> Result<(), ControllerFault> {
        self.clock.advance(self.latency);
        Ok(())
    }
}

fn build_round(run_id: &str, latency: Duration) -> RoundLoop {
    let clock = ManualWallClock::new();
    let controller = SlowController { clock: clock.clone(), latency };
    RoundLoop::build_test(run_id.into(), 42, Box::new(controller))
        .expect("build round")
        .with_wall_clock(Box::new(clock))
}

fn count<F: Fn(&RoundEvent) -> bool>(events: &[RoundEvent], pred: F) -> usize {
    events.iter().filter(|e| pred(*e)).count()
}

/// 20 ms per 20 ms tick: the first window holds at least 1.0 s of controller
/// time, which is exactly the warning boundary.
#[test]
fn one_second_of_controller_time_is_a_warning() {
    let mut round = build_round("warn-boundary", Duration::from_millis(20));
    let events = round.run_ticks(55).unwrap();

    let warnings = count(&events, |e| matches!(e, RoundEvent::ControllerOverBudget { .. }));
    assert_eq!(warnings, 1, "Expected exactly one warning in the first window");
    assert!((round.score() - -1.0).abs() < 1e-9, "Warning costs one point, score {}", round.score());
    assert_eq!(round.phase(), RoundPhase::Running);
}

#[test]
fn just_under_one_second_is_free() {
    let mut round = build_round("warn-below", Duration::from_millis(19));
    let events = round.run_ticks(55).unwrap();

    assert_eq!(count(&events, |e| matches!(e, RoundEvent::ControllerOverBudget { .. })), 0);
    assert_eq!(round.score(), 0.0);
}

/// 100 ms per tick: at least 5.0 s in the first window, which forfeits.
#[test]
fn five_seconds_of_controller_time_forfeits() {
    let mut round = build_round("forfeit-boundary", Duration::from_millis(100));
    let events = round.run_ticks(55).unwrap();

    assert_eq!(count(&events, |e| matches!(e, RoundEvent::Forfeited { .. })), 1);
    assert_eq!(
        count(&events, |e| matches!(e, RoundEvent::ControllerOverBudget { .. })),
        0,
        "Forfeiture replaces the warning, it does not add to it"
    );
    assert!((round.score() - -5.0).abs() < 1e-9, "Forfeit costs five points, score {}", round.score());
    assert_eq!(round.phase(), RoundPhase::Forfeited);
    assert!(round.telemetry_state().forfeited);
}

#[test]
fn just_under_five_seconds_is_only_a_warning() {
    let mut round = build_round("forfeit-below", Duration::from_millis(98));
    let events = round.run_ticks(55).unwrap();

    assert_eq!(count(&events, |e| matches!(e, RoundEvent::Forfeited { .. })), 0);
    assert_eq!(count(&events, |e| matches!(e, RoundEvent::ControllerOverBudget { .. })), 1);
    assert!((round.score() - -1.0).abs() < 1e-9);
    assert_eq!(round.phase(), RoundPhase::Running);
}

/// After forfeiture nothing moves the score or the ball counter, not even
/// a goal or a joint far outside its limits.
#[test]
fn forfeited_round_is_frozen() {
    let mut round = build_round("forfeit-frozen", Duration::from_millis(100));
    round.run_ticks(60).unwrap();
    assert!(round.supervisor().is_forfeited());
    let score = round.score();
    let attempts = round.ball_attempts();

    round.world_mut().set_joint_positions(0, &[5.0, 5.0, 5.0]);
    let events = round.run_ticks(300).unwrap();

    assert_eq!(round.score(), score, "Score moved after forfeiture");
    assert_eq!(round.ball_attempts(), attempts, "Ball attempts moved after forfeiture");
    assert!(
        events.iter().all(|e| e.score_delta() == 0.0),
        "Scoring events emitted after forfeiture: {events:?}"
    );
}

/// Window accounting is persisted like every other score change.
#[test]
fn budget_penalties_reach_the_event_log() {
    let mut round = build_round("budget-log", Duration::from_millis(30));
    round.run_ticks(160).unwrap();

    let run_id = round.run_id.clone();
    let logged = round.store().event_count_by_type(&run_id, "controller_over_budget").unwrap();
    assert!(logged >= 2, "Expected a warning per closed window, got {logged}");
    let total = round.store().score_delta_total(&run_id).unwrap();
    assert!((total - round.score()).abs() < 1e-9, "Log total {total} != score {}", round.score());
}
