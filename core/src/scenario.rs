//! Scenario files — the world a round is played in.
//!
//! A scenario is plain JSON. Loading failures are construction failures:
//! they abort startup and are surfaced as RoundError::WorldLoad.

use crate::{
    error::{RoundError, RoundResult},
    types::{RigidTransform, Vec3},
};
use serde::{Deserialize, Serialize};

/// Joint checks cover the first seven DOFs, so the robot needs at least that many.
pub const MIN_ROBOT_JOINTS: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Half-size of the playing field in x and y, centred on the origin.
    pub field_half_extents: [f64; 2],
    #[serde(default = "default_gravity")]
    pub gravity: f64,
    /// Fraction of horizontal ball speed lost per second while rolling.
    #[serde(default = "default_rolling_friction")]
    pub rolling_friction: f64,
    pub robot: RobotSpec,
    /// Index 0 is the ball; every further object is a scripted obstacle.
    pub rigid_objects: Vec<RigidObjectSpec>,
    pub terrains: Vec<TerrainSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotSpec {
    pub joint_min:       Vec<f64>,
    pub joint_max:       Vec<f64>,
    pub velocity_limits: Vec<f64>,
    pub torque_limits:   Vec<f64>,
    pub initial_config:  Vec<f64>,
    pub links:           Vec<LinkSpec>,
}

/// Contact marker for one robot link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub name:     String,
    pub position: Vec3,
    pub radius:   f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidObjectSpec {
    pub name:      String,
    pub transform: RigidTransform,
    pub radius:    f64,
}

/// A flat terrain slab whose top surface sits at `height`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainSpec {
    pub name:   String,
    pub height: f64,
}

fn default_gravity() -> f64 { 9.81 }
fn default_rolling_friction() -> f64 { 0.4 }

impl Scenario {
    /// Read and validate a scenario file.
    pub fn load(path: &str) -> RoundResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RoundError::WorldLoad {
            path:   path.to_string(),
            reason: e.to_string(),
        })?;
        let scenario: Scenario =
            serde_json::from_str(&content).map_err(|e| RoundError::WorldLoad {
                path:   path.to_string(),
                reason: e.to_string(),
            })?;
        scenario.validate()?;
        log::info!(
            "Loaded scenario '{}' from {path}: {} rigid objects, {} terrains, {} joints",
            scenario.name,
            scenario.rigid_objects.len(),
            scenario.terrains.len(),
            scenario.robot.joint_count()
        );
        Ok(scenario)
    }

    pub fn validate(&self) -> RoundResult<()> {
        let invalid = |reason: String| Err(RoundError::InvalidScenario { reason });

        if self.rigid_objects.is_empty() {
            return invalid("scenario has no ball (rigid object 0)".into());
        }
        let robot = &self.robot;
        let n = robot.joint_count();
        if n < MIN_ROBOT_JOINTS {
            return invalid(format!("robot has {n} joints, at least {MIN_ROBOT_JOINTS} required"));
        }
        for (label, len) in [
            ("joint_max", robot.joint_max.len()),
            ("velocity_limits", robot.velocity_limits.len()),
            ("torque_limits", robot.torque_limits.len()),
            ("initial_config", robot.initial_config.len()),
        ] {
            if len != n {
                return invalid(format!("{label} has {len} entries, expected {n}"));
            }
        }
        if robot.links.is_empty() {
            return invalid("robot has no links".into());
        }
        if self.field_half_extents.iter().any(|h| *h <= 0.0) {
            return invalid("field half extents must be positive".into());
        }
        Ok(())
    }

    /// The stock field: a 7-DOF arm at the origin, a ball in front of it,
    /// three obstacles between the ball and the goal.
    pub fn default_field() -> Self {
        let links = (0..MIN_ROBOT_JOINTS)
            .map(|i| LinkSpec {
                name:     format!("link{i}"),
                position: [0.0, 0.0, 0.2 + 0.12 * i as f64],
                radius:   0.08,
            })
            .collect();
        let obstacle = |name: &str, translation: Vec3| RigidObjectSpec {
            name:      name.to_string(),
            transform: RigidTransform::from_translation(translation),
            radius:    0.2,
        };

        Self {
            name: "default_field".into(),
            field_half_extents: [4.0, 2.0],
            gravity: default_gravity(),
            rolling_friction: default_rolling_friction(),
            robot: RobotSpec {
                joint_min:       vec![-2.9; MIN_ROBOT_JOINTS],
                joint_max:       vec![2.9; MIN_ROBOT_JOINTS],
                velocity_limits: vec![2.0; MIN_ROBOT_JOINTS],
                torque_limits:   vec![50.0; MIN_ROBOT_JOINTS],
                initial_config:  vec![0.0; MIN_ROBOT_JOINTS],
                links,
            },
            rigid_objects: vec![
                RigidObjectSpec {
                    name:      "ball".into(),
                    transform: RigidTransform::from_translation([1.0, 0.0, 0.1]),
                    radius:    0.1,
                },
                obstacle("obstacle1", [2.0, 0.0, 0.3]),
                obstacle("obstacle2", [2.5, 0.5, 0.3]),
                obstacle("obstacle3", [3.0, -0.5, 0.3]),
            ],
            terrains: vec![TerrainSpec { name: "floor".into(), height: 0.0 }],
        }
    }
}

impl RobotSpec {
    pub fn joint_count(&self) -> usize {
        self.joint_min.len()
    }
}
