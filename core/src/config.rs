//! Round configuration — immutable per-round parameters.
//!
//! RULE: Every scoring constant lives here. Supervisor code never
//! hard-codes a threshold, rate or point value.

use crate::{
    error::RoundError,
    types::{SimTime, Vec3},
};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, time::Duration};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Easy   => "easy",
            Self::Medium => "medium",
            Self::Hard   => "hard",
        }
    }

    /// Length of a round in simulated seconds.
    pub fn round_duration(&self) -> SimTime {
        match self {
            Self::Easy   => 60.0,
            Self::Medium => 50.0,
            Self::Hard   => 40.0,
        }
    }

    pub fn obstacle_motion(&self) -> ObstacleMotion {
        match self {
            Self::Easy   => ObstacleMotion { period_base: 5.0, period_per_index: 2.0, amplitude: 1.2 },
            Self::Medium => ObstacleMotion { period_base: 4.0, period_per_index: 2.0, amplitude: 0.9 },
            Self::Hard   => ObstacleMotion { period_base: 5.0, period_per_index: 1.5, amplitude: 0.6 },
        }
    }
}

impl FromStr for Difficulty {
    type Err = RoundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy"   => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard"   => Ok(Self::Hard),
            _ => Err(RoundError::UnknownDifficulty { value: s.to_string() }),
        }
    }
}

/// Oscillation parameters for scripted obstacles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleMotion {
    pub period_base:      f64,
    pub period_per_index: f64,
    pub amplitude:        f64,
}

impl ObstacleMotion {
    /// Period in seconds of the obstacle at rigid-object index `index`.
    pub fn period(&self, index: usize) -> f64 {
        self.period_base + self.period_per_index * index as f64
    }
}

/// Axis-aligned scoring box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalVolume {
    pub center:       Vec3,
    pub half_extents: Vec3,
}

impl GoalVolume {
    /// Strictly inside on all three axes; the faces do not count.
    pub fn contains(&self, point: Vec3) -> bool {
        (0..3).all(|i| {
            point[i] > self.center[i] - self.half_extents[i]
                && point[i] < self.center[i] + self.half_extents[i]
        })
    }
}

impl Default for GoalVolume {
    fn default() -> Self {
        Self {
            center:       [3.5, 0.0, 0.5],
            half_extents: [0.25, 1.0, 0.5],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    pub difficulty:        Difficulty,
    pub max_ball_attempts: u32,
    /// Length of one controller-time accounting window.
    #[serde(with = "secs_f64")]
    pub penalty_window:            Duration,
    #[serde(with = "secs_f64")]
    pub controller_warn_budget:    Duration,
    #[serde(with = "secs_f64")]
    pub controller_forfeit_budget: Duration,
    pub warn_penalty:         f64,
    pub forfeit_penalty:      f64,
    /// Points per second lost while any joint/velocity/torque limit is exceeded.
    pub limit_penalty_rate:   f64,
    /// Points per second lost while the robot touches terrain.
    pub terrain_penalty_rate: f64,
    pub goal_points:          f64,
    pub goal:                 GoalVolume,
    /// Seconds without a touch after which a touched ball respawns.
    pub ball_idle_timeout:    SimTime,
    pub floor_height:         f64,
    /// Number of leading DOFs covered by the joint-limit check.
    pub checked_joints:       usize,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            difficulty:                Difficulty::Easy,
            max_ball_attempts:         10,
            penalty_window:            Duration::from_secs(1),
            controller_warn_budget:    Duration::from_secs(1),
            controller_forfeit_budget: Duration::from_secs(5),
            warn_penalty:              1.0,
            forfeit_penalty:           5.0,
            limit_penalty_rate:        10.0,
            terrain_penalty_rate:      30.0,
            goal_points:               10.0,
            goal:                      GoalVolume::default(),
            ball_idle_timeout:         3.0,
            floor_height:              0.0,
            checked_joints:            7,
        }
    }
}

impl RoundConfig {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        Self { difficulty, ..Self::default() }
    }

    pub fn round_duration(&self) -> SimTime {
        self.difficulty.round_duration()
    }

    pub fn obstacle_motion(&self) -> ObstacleMotion {
        self.difficulty.obstacle_motion()
    }

    /// Load overrides from a JSON file. Missing fields take their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: RoundConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Defaults used by tests: easy difficulty, stock constants.
    pub fn default_test() -> Self {
        Self::default()
    }
}

/// Construction-time inputs that select and seed a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub difficulty:        Difficulty,
    pub random_seed:       u64,
    pub omniscient_sensor: bool,
    /// Uniform pixel noise on blob-detector centres; 0 disables it.
    pub pixel_noise:       f64,
    /// Fixed physics timestep in seconds.
    pub dt:                SimTime,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            difficulty:        Difficulty::Easy,
            random_seed:       0,
            omniscient_sensor: false,
            pixel_noise:       0.0,
            dt:                0.02,
        }
    }
}

impl RunSettings {
    pub fn round_config(&self) -> RoundConfig {
        RoundConfig::for_difficulty(self.difficulty)
    }
}

mod secs_f64 {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_duration_follows_difficulty() {
        assert_eq!(RoundConfig::for_difficulty(Difficulty::Easy).round_duration(), 60.0);
        assert_eq!(RoundConfig::for_difficulty(Difficulty::Medium).round_duration(), 50.0);
        assert_eq!(RoundConfig::for_difficulty(Difficulty::Hard).round_duration(), 40.0);
    }

    #[test]
    fn obstacle_periods_per_difficulty() {
        assert_eq!(Difficulty::Easy.obstacle_motion().period(1), 7.0);
        assert_eq!(Difficulty::Medium.obstacle_motion().period(2), 8.0);
        assert_eq!(Difficulty::Hard.obstacle_motion().period(2), 8.0);
        assert_eq!(Difficulty::Hard.obstacle_motion().amplitude, 0.6);
    }

    #[test]
    fn goal_volume_excludes_faces() {
        let goal = GoalVolume::default();
        assert!(goal.contains([3.5, 0.0, 0.5]));
        assert!(goal.contains([3.3, 0.9, 0.1]));
        assert!(!goal.contains([3.25, 0.0, 0.5]), "min x face is outside");
        assert!(!goal.contains([3.5, 1.0, 0.5]), "max y face is outside");
        assert!(!goal.contains([3.5, 0.0, 0.0]), "floor is outside");
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("Hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!(matches!(
            "insane".parse::<Difficulty>(),
            Err(RoundError::UnknownDifficulty { .. })
        ));
    }

    #[test]
    fn partial_json_takes_defaults() {
        let config: RoundConfig =
            serde_json::from_str(r#"{ "difficulty": "medium", "controller_forfeit_budget": 2.5 }"#)
                .unwrap();
        assert_eq!(config.difficulty, Difficulty::Medium);
        assert_eq!(config.controller_forfeit_budget, Duration::from_millis(2500));
        assert_eq!(config.max_ball_attempts, 10);
        assert_eq!(config.goal, GoalVolume::default());
    }
}
