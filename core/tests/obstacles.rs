//! Obstacle scripting: poses are a pure function of seed and time.

use supervisor_core::{
    config::{Difficulty, RoundConfig},
    controller::IdleController,
    engine::RoundLoop,
    obstacles::obstacle_pose,
    world::PhysicsWorld,
};

fn build_round(run_id: &str, seed: u64, difficulty: Difficulty) -> RoundLoop {
    RoundLoop::build_test_with_config(
        run_id.into(),
        seed,
        RoundConfig::for_difficulty(difficulty),
        Box::new(IdleController),
    )
    .expect("build round")
}

#[test]
fn obstacle_poses_follow_the_closed_form() {
    let mut round = build_round("closed-form", 21, Difficulty::Medium);
    round.run_ticks(137).unwrap();

    let state = &round.supervisor().state;
    let initial = state.initial_object_poses.as_ref().expect("poses captured");
    let offsets = state.obstacle_phase_offsets.as_ref().expect("offsets drawn");
    assert_eq!(offsets.len(), round.world().rigid_object_count());

    let t = round.sim_time();
    let motion = Difficulty::Medium.obstacle_motion();
    for index in 1..round.world().rigid_object_count() {
        let id = round.world().rigid_object_id(index);
        let (expected, velocity) = obstacle_pose(&initial[index], index, offsets[index], motion, t);
        assert_eq!(round.world().body_transform(id), expected, "obstacle {index} pose");
        assert_eq!(round.world().body_velocity(id), velocity, "obstacle {index} velocity");
    }
}

#[test]
fn obstacles_only_move_sideways_within_amplitude() {
    let mut round = build_round("amplitude", 8, Difficulty::Easy);
    round.run_ticks(1).unwrap();
    let initial = round.supervisor().state.initial_object_poses.clone().unwrap();
    let amplitude = Difficulty::Easy.obstacle_motion().amplitude;

    for _ in 0..300 {
        round.run_ticks(1).unwrap();
        for index in 1..initial.len() {
            let id = round.world().rigid_object_id(index);
            let now = round.world().body_transform(id).translation;
            let start = initial[index].translation;
            assert_eq!(now[0], start[0], "obstacle {index} drifted in x");
            assert_eq!(now[2], start[2], "obstacle {index} drifted in z");
            assert!((now[1] - start[1]).abs() <= amplitude + 1e-12);
        }
    }
}

#[test]
fn obstacles_are_never_simulated() {
    let mut round = build_round("disabled", 8, Difficulty::Hard);
    round.run_ticks(3).unwrap();
    for index in 1..round.world().rigid_object_count() {
        let id = round.world().rigid_object_id(index);
        assert!(!round.world().body_enabled(id), "obstacle {index} still simulated");
    }
    let ball = round.world().rigid_object_id(0);
    assert!(round.world().body_enabled(ball), "ball must stay simulated");
}

#[test]
fn same_seed_same_time_same_pose() {
    let mut round_a = build_round("replay-a", 77, Difficulty::Hard);
    let mut round_b = build_round("replay-b", 77, Difficulty::Hard);
    round_a.run_ticks(250).unwrap();
    round_b.run_ticks(250).unwrap();

    for index in 1..round_a.world().rigid_object_count() {
        let id = round_a.world().rigid_object_id(index);
        assert_eq!(
            round_a.world().body_transform(id),
            round_b.world().body_transform(id),
            "obstacle {index} diverged"
        );
    }
}
