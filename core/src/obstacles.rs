//! Scripted obstacle motion.
//!
//! Obstacles are not simulated. Each tick their pose is a closed-form
//! function of elapsed time and a phase offset drawn once per round, so
//! replaying the same times with the same seed reproduces every pose.

use crate::{
    config::ObstacleMotion,
    rng::SubsystemRng,
    types::{RigidTransform, SimTime, Twist},
};
use std::f64::consts::TAU;

/// One uniform [0, 2π) phase offset per rigid object. Index 0 (the ball)
/// gets a draw too, which keeps obstacle `i` on offset `i`.
pub fn draw_phase_offsets(object_count: usize, rng: &mut SubsystemRng) -> Vec<f64> {
    (0..object_count).map(|_| rng.uniform(0.0, TAU)).collect()
}

/// Pose and velocity of obstacle `index` at time `t`, oscillating along y
/// around its initial pose.
pub fn obstacle_pose(
    initial:      &RigidTransform,
    index:        usize,
    phase_offset: f64,
    motion:       ObstacleMotion,
    t:            SimTime,
) -> (RigidTransform, Twist) {
    let period = motion.period(index);
    let phase = index as f64 + phase_offset;
    let angle = (t + phase) / period * TAU;
    let delta = motion.amplitude * angle.sin();
    let vdelta = motion.amplitude * angle.cos() * TAU / period;
    (
        initial.translated([0.0, delta, 0.0]),
        Twist::linear([0.0, vdelta, 0.0]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Difficulty, rng::{RngBank, RngSlot}};

    #[test]
    fn offsets_are_in_range_and_seeded() {
        let mut a = RngBank::new(11).for_slot(RngSlot::Obstacles);
        let mut b = RngBank::new(11).for_slot(RngSlot::Obstacles);
        let offsets = draw_phase_offsets(4, &mut a);
        assert_eq!(offsets.len(), 4);
        assert!(offsets.iter().all(|o| (0.0..TAU).contains(o)));
        assert_eq!(offsets, draw_phase_offsets(4, &mut b));
    }

    #[test]
    fn pose_is_a_pure_function_of_time() {
        let initial = RigidTransform::from_translation([2.0, 0.0, 0.3]);
        let motion = Difficulty::Medium.obstacle_motion();
        let first = obstacle_pose(&initial, 2, 1.3, motion, 7.25);
        let _ = obstacle_pose(&initial, 2, 1.3, motion, 3.0);
        let again = obstacle_pose(&initial, 2, 1.3, motion, 7.25);
        assert_eq!(first, again);
    }

    #[test]
    fn motion_is_vertical_offset_in_y_only() {
        let initial = RigidTransform::from_translation([2.0, 0.5, 0.3]);
        let motion = Difficulty::Easy.obstacle_motion();
        for step in 0..200 {
            let (pose, twist) = obstacle_pose(&initial, 1, 0.4, motion, step as f64 * 0.05);
            assert_eq!(pose.translation[0], 2.0);
            assert_eq!(pose.translation[2], 0.3);
            assert!((pose.translation[1] - 0.5).abs() <= motion.amplitude + 1e-12);
            assert_eq!(twist.angular, [0.0; 3]);
            assert_eq!(twist.linear[0], 0.0);
        }
    }

    #[test]
    fn velocity_is_derivative_of_offset() {
        let initial = RigidTransform::from_translation([0.0; 3]);
        let motion = Difficulty::Hard.obstacle_motion();
        let h = 1e-6;
        let (before, _) = obstacle_pose(&initial, 3, 0.7, motion, 2.0 - h);
        let (after, _) = obstacle_pose(&initial, 3, 0.7, motion, 2.0 + h);
        let (_, twist) = obstacle_pose(&initial, 3, 0.7, motion, 2.0);
        let numeric = (after.translation[1] - before.translation[1]) / (2.0 * h);
        assert!((numeric - twist.linear[1]).abs() < 1e-6);
    }
}
