//! Ball lifecycle: touches, goals, idle timeout, fall-off and respawn.

use crate::{
    config::RoundConfig,
    event::RespawnCause,
    types::{SimTime, Vec3},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    /// Respawns so far. Only ever increases.
    pub attempts:        u32,
    /// Last robot contact since the ball spawned.
    pub last_touch_time: Option<SimTime>,
}

/// What one tick of observation decided about the ball.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BallVerdict {
    /// First touch since the ball last spawned.
    pub first_touch: bool,
    pub goal:        bool,
    /// Empty when the ball stays where it is.
    pub causes:      Vec<RespawnCause>,
}

impl BallVerdict {
    pub fn respawn(&self) -> bool {
        !self.causes.is_empty()
    }
}

impl BallState {
    /// Apply one tick of observation. A respawn, however many causes fired,
    /// clears the touch and counts exactly one attempt.
    pub fn observe(
        &mut self,
        now:      SimTime,
        touching: bool,
        position: Vec3,
        config:   &RoundConfig,
    ) -> BallVerdict {
        let mut verdict = BallVerdict::default();

        if touching {
            verdict.first_touch = self.last_touch_time.is_none();
            self.last_touch_time = Some(now);
        }

        if self.attempts < config.max_ball_attempts && config.goal.contains(position) {
            verdict.goal = true;
            verdict.causes.push(RespawnCause::Goal);
        }

        if let Some(touched_at) = self.last_touch_time {
            if now > touched_at + config.ball_idle_timeout {
                verdict.causes.push(RespawnCause::IdleTimeout);
            }
        }

        if position[2] < config.floor_height {
            verdict.causes.push(RespawnCause::FellOff);
        }

        if verdict.respawn() {
            self.last_touch_time = None;
            self.attempts += 1;
        }
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIDFIELD: Vec3 = [1.0, 0.0, 0.1];
    const IN_GOAL: Vec3 = [3.5, 0.0, 0.1];

    #[test]
    fn untouched_ball_never_times_out() {
        let config = RoundConfig::default_test();
        let mut ball = BallState::default();
        for step in 0..1000 {
            let verdict = ball.observe(step as f64 * 0.02, false, MIDFIELD, &config);
            assert!(!verdict.respawn(), "respawned at step {step}");
        }
        assert_eq!(ball.attempts, 0);
    }

    #[test]
    fn touched_ball_respawns_after_idle_timeout() {
        let config = RoundConfig::default_test();
        let mut ball = BallState::default();
        assert!(ball.observe(1.0, true, MIDFIELD, &config).first_touch);
        assert!(!ball.observe(4.0, false, MIDFIELD, &config).respawn(), "exactly 3s is not past");
        let verdict = ball.observe(4.02, false, MIDFIELD, &config);
        assert_eq!(verdict.causes, vec![RespawnCause::IdleTimeout]);
        assert_eq!(ball.last_touch_time, None);
        assert_eq!(ball.attempts, 1);
    }

    #[test]
    fn repeated_touches_extend_the_timeout() {
        let config = RoundConfig::default_test();
        let mut ball = BallState::default();
        ball.observe(1.0, true, MIDFIELD, &config);
        let verdict = ball.observe(3.0, true, MIDFIELD, &config);
        assert!(!verdict.first_touch);
        assert!(!ball.observe(5.5, false, MIDFIELD, &config).respawn());
    }

    #[test]
    fn simultaneous_causes_count_one_attempt() {
        let config = RoundConfig::default_test();
        let mut ball = BallState::default();
        ball.observe(0.0, true, MIDFIELD, &config);
        // In the goal box footprint but below the floor, long after the touch.
        let below_goal = [3.5, 0.0, -0.1];
        let mut tall_goal = config.clone();
        tall_goal.goal.half_extents[2] = 1.0;
        let verdict = ball.observe(10.0, false, below_goal, &tall_goal);
        assert_eq!(
            verdict.causes,
            vec![RespawnCause::Goal, RespawnCause::IdleTimeout, RespawnCause::FellOff]
        );
        assert_eq!(ball.attempts, 1);
    }

    #[test]
    fn goals_stop_counting_after_max_attempts() {
        let config = RoundConfig::default_test();
        let mut ball = BallState::default();
        for attempt in 0..config.max_ball_attempts {
            let verdict = ball.observe(attempt as f64, false, IN_GOAL, &config);
            assert!(verdict.goal, "attempt {attempt} should score");
        }
        let verdict = ball.observe(100.0, false, IN_GOAL, &config);
        assert!(!verdict.goal);
        assert!(!verdict.respawn());

        let verdict = ball.observe(101.0, false, [5.0, 0.0, -1.0], &config);
        assert_eq!(verdict.causes, vec![RespawnCause::FellOff]);
        assert_eq!(ball.attempts, config.max_ball_attempts + 1);
    }
}
