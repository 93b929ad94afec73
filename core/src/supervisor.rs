//! The event supervisor — referee of one round.
//!
//! EXECUTION ORDER of update() (fixed, never reordered):
//!   1. Capture initial object poses (first call only)
//!   2. Suspend simulation of every obstacle
//!   3. Penalty window evaluation (may forfeit and stop here)
//!   4. Joint / velocity / torque limit checks
//!   5. Terrain contact check
//!   6. Ball logic, then obstacle scripting
//!
//! RULES:
//!   - Once forfeited, update() and record_controller_time() are no-ops.
//!   - Every score change goes through apply(), which logs and records
//!     the carrying RoundEvent.
//!   - The supervisor has no physics of its own; it reads and writes the
//!     world only through PhysicsWorld.

use crate::{
    ball::BallState,
    config::RoundConfig,
    error::{RoundError, RoundResult},
    event::{RespawnCause, RoundEvent},
    limits::{JointSample, LimitKind},
    obstacles::{draw_phase_offsets, obstacle_pose},
    penalty::{BudgetVerdict, PenaltyWindow},
    rng::SubsystemRng,
    types::{BodyId, RigidTransform, SimTime, Tick, Twist},
    world::PhysicsWorld,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The supervised robot.
pub const ROBOT: usize = 0;

/// Rigid object index of the ball.
pub const BALL: usize = 0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupervisorState {
    pub score:                  f64,
    /// One-way latch.
    pub forfeited:              bool,
    pub window:                 PenaltyWindow,
    pub ball:                   BallState,
    /// Index 0 is the ball; captured once on the first update.
    pub initial_object_poses:   Option<Vec<RigidTransform>>,
    /// Drawn once on the first obstacle-scripting pass.
    pub obstacle_phase_offsets: Option<Vec<f64>>,
    /// Set once when the round clock runs out; never reset.
    pub final_score:            Option<f64>,
}

pub struct Supervisor {
    config:      RoundConfig,
    link_ids:    Vec<BodyId>,
    terrain_ids: Vec<BodyId>,
    object_ids:  Vec<BodyId>,
    rng:         SubsystemRng,
    pub state:   SupervisorState,
}

impl Supervisor {
    /// Enables contact feedback for every robot link against every terrain
    /// and against the ball.
    pub fn new(
        world:  &mut dyn PhysicsWorld,
        config: RoundConfig,
        rng:    SubsystemRng,
    ) -> RoundResult<Self> {
        if world.robot_count() == 0 {
            return Err(RoundError::InvalidScenario { reason: "world has no robot".into() });
        }
        if world.rigid_object_count() == 0 {
            return Err(RoundError::InvalidScenario { reason: "world has no ball".into() });
        }

        let link_ids = world.robot_link_ids(ROBOT);
        let terrain_ids = world.terrain_ids();
        let object_ids = world.rigid_object_ids();
        let ball_id = object_ids[BALL];

        for link in &link_ids {
            for terrain in &terrain_ids {
                world.enable_contact_feedback(*link, *terrain);
            }
            world.enable_contact_feedback(*link, ball_id);
        }

        log::info!(
            "Event supervisor: {} round, {}s, {} links watched against {} terrains",
            config.difficulty.name(),
            config.round_duration(),
            link_ids.len(),
            terrain_ids.len()
        );

        Ok(Self {
            config,
            link_ids,
            terrain_ids,
            object_ids,
            rng,
            state: SupervisorState::default(),
        })
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    pub fn score(&self) -> f64 {
        self.state.score
    }

    pub fn is_forfeited(&self) -> bool {
        self.state.forfeited
    }

    pub fn ball_attempts(&self) -> u32 {
        self.state.ball.attempts
    }

    pub fn final_score(&self) -> Option<f64> {
        self.state.final_score
    }

    fn ball_id(&self) -> BodyId {
        self.object_ids[BALL]
    }

    /// Charge controller wall-clock time to the current penalty window.
    pub fn record_controller_time(&mut self, elapsed: Duration) {
        if self.state.forfeited {
            return;
        }
        self.state.window.record(elapsed);
    }

    /// Snapshot the current score as final. Returns it only the first time.
    pub fn record_final_score(&mut self) -> Option<f64> {
        if self.state.final_score.is_some() {
            return None;
        }
        self.state.final_score = Some(self.state.score);
        self.state.final_score
    }

    fn apply(&mut self, event: RoundEvent, events: &mut Vec<RoundEvent>) {
        self.state.score += event.score_delta();
        events.push(event);
    }

    /// One supervisory pass. Returns the events it produced.
    pub fn update(
        &mut self,
        world: &mut dyn PhysicsWorld,
        dt:    SimTime,
        tick:  Tick,
    ) -> Vec<RoundEvent> {
        let mut events = Vec::new();
        if self.state.forfeited {
            return events;
        }

        if self.state.initial_object_poses.is_none() {
            let poses = self.object_ids.iter().map(|id| world.body_transform(*id)).collect();
            self.state.initial_object_poses = Some(poses);
        }
        for id in self.object_ids.iter().skip(1) {
            world.set_body_enabled(*id, false);
        }

        let now = world.sim_time();
        if self.evaluate_penalty_window(now, tick, &mut events) {
            return events;
        }
        self.check_limits(world, now, dt, tick, &mut events);
        self.check_terrain_contact(world, now, dt, tick, &mut events);
        self.referee_ball(world, now, tick, &mut events);
        self.script_obstacles(world, now);
        events
    }

    /// Returns true when the round was forfeited.
    fn evaluate_penalty_window(
        &mut self,
        now:    SimTime,
        tick:   Tick,
        events: &mut Vec<RoundEvent>,
    ) -> bool {
        match self.state.window.evaluate(now, &self.config) {
            Some(BudgetVerdict::Forfeit { spent }) => {
                log::warn!(
                    "Event supervisor: Took too long to compute controls ({:.3}s over the last {:?}). Result: forfeit",
                    spent.as_secs_f64(),
                    self.config.penalty_window
                );
                let penalty = self.config.forfeit_penalty;
                self.apply(
                    RoundEvent::Forfeited {
                        tick,
                        time: now,
                        controller_time: spent.as_secs_f64(),
                        penalty,
                    },
                    events,
                );
                self.state.forfeited = true;
                true
            }
            Some(BudgetVerdict::Warning { spent }) => {
                let penalty = self.config.warn_penalty;
                log::info!(
                    "Event supervisor: Took too long to compute controls. Time {:.3}s over the last {:?}. Penalty: {penalty}",
                    spent.as_secs_f64(),
                    self.config.penalty_window
                );
                self.apply(
                    RoundEvent::ControllerOverBudget {
                        tick,
                        time: now,
                        controller_time: spent.as_secs_f64(),
                        penalty,
                    },
                    events,
                );
                false
            }
            Some(BudgetVerdict::WithinBudget { .. }) | None => false,
        }
    }

    fn check_limits(
        &mut self,
        world:  &dyn PhysicsWorld,
        now:    SimTime,
        dt:     SimTime,
        tick:   Tick,
        events: &mut Vec<RoundEvent>,
    ) {
        let (joint_min, joint_max) = world.joint_limits(ROBOT);
        let sample = JointSample {
            positions:       world.joint_positions(ROBOT),
            velocities:      world.joint_velocities(ROBOT),
            torques:         world.joint_torques(ROBOT),
            joint_min,
            joint_max,
            velocity_limits: world.velocity_limits(ROBOT),
            torque_limits:   world.torque_limits(ROBOT),
        };
        let penalty = self.config.limit_penalty_rate * dt;

        for v in sample.violations(self.config.checked_joints) {
            let event = match v.kind {
                LimitKind::JointPosition => {
                    log::info!(
                        "Event supervisor: Out of joint limits (dof {} = {:.4} outside [{:.4}, {:.4}])",
                        v.dof, v.value, v.min, v.max
                    );
                    RoundEvent::JointLimitViolated {
                        tick, time: now, dof: v.dof, value: v.value, min: v.min, max: v.max, penalty,
                    }
                }
                LimitKind::Velocity => {
                    log::info!(
                        "Event supervisor: Out of velocity limits (dof {} = {:.4}, limit {:.4})",
                        v.dof, v.value, v.max
                    );
                    RoundEvent::VelocityLimitViolated {
                        tick, time: now, dof: v.dof, value: v.value, limit: v.max, penalty,
                    }
                }
                LimitKind::Torque => {
                    log::info!(
                        "Event supervisor: Out of torque limits (torque {} = {:.4}, limit {:.4})",
                        v.dof, v.value, v.max
                    );
                    RoundEvent::TorqueLimitViolated {
                        tick, time: now, dof: v.dof, value: v.value, limit: v.max, penalty,
                    }
                }
            };
            self.apply(event, events);
        }
    }

    fn check_terrain_contact(
        &mut self,
        world:  &dyn PhysicsWorld,
        now:    SimTime,
        dt:     SimTime,
        tick:   Tick,
        events: &mut Vec<RoundEvent>,
    ) {
        let in_contact = self.link_ids.iter().any(|link| {
            self.terrain_ids.iter().any(|terrain| world.had_contact(*link, *terrain))
        });
        if in_contact {
            log::info!("Event supervisor: in contact with terrain");
            let penalty = self.config.terrain_penalty_rate * dt;
            self.apply(RoundEvent::TerrainContact { tick, time: now, penalty }, events);
        }
    }

    fn referee_ball(
        &mut self,
        world:  &mut dyn PhysicsWorld,
        now:    SimTime,
        tick:   Tick,
        events: &mut Vec<RoundEvent>,
    ) {
        let ball_id = self.ball_id();
        let touching = self.link_ids.iter().any(|link| world.had_contact(*link, ball_id));
        world.set_body_enabled(ball_id, true);

        let attempt = self.state.ball.attempts;
        let position = world.body_transform(ball_id).translation;
        let verdict = self.state.ball.observe(now, touching, position, &self.config);

        if verdict.first_touch {
            log::debug!("Event supervisor: Ball {attempt} touched");
            events.push(RoundEvent::BallTouched { tick, time: now, attempt });
        }
        if verdict.goal {
            let points = self.config.goal_points;
            log::info!("Event supervisor: Ball {attempt} scored, adding {points} points");
            self.apply(RoundEvent::GoalScored { tick, time: now, attempt, points }, events);
        }
        if !verdict.respawn() {
            return;
        }

        for cause in &verdict.causes {
            match cause {
                RespawnCause::IdleTimeout => log::info!(
                    "Event supervisor: Ball {attempt} passed {} seconds, respawning",
                    self.config.ball_idle_timeout
                ),
                RespawnCause::FellOff => log::info!(
                    "Event supervisor: Ball {attempt} fell off the playing field, respawning"
                ),
                RespawnCause::Goal => {}
            }
        }
        if let Some(spawn) = self.state.initial_object_poses.as_ref().and_then(|p| p.get(BALL)) {
            world.set_body_transform(ball_id, *spawn);
        }
        world.set_body_velocity(ball_id, Twist::ZERO);
        events.push(RoundEvent::BallRespawned {
            tick,
            time: now,
            attempts: self.state.ball.attempts,
            causes: verdict.causes,
        });
    }

    fn script_obstacles(&mut self, world: &mut dyn PhysicsWorld, now: SimTime) {
        if self.state.obstacle_phase_offsets.is_none() {
            let offsets = draw_phase_offsets(self.object_ids.len(), &mut self.rng);
            log::debug!("Event supervisor: obstacle phase offsets {offsets:?}");
            self.state.obstacle_phase_offsets = Some(offsets);
        }
        let (Some(offsets), Some(initial)) = (
            self.state.obstacle_phase_offsets.as_ref(),
            self.state.initial_object_poses.as_ref(),
        ) else {
            return;
        };

        let motion = self.config.obstacle_motion();
        for (index, id) in self.object_ids.iter().enumerate().skip(1) {
            let (Some(pose), Some(offset)) = (initial.get(index), offsets.get(index)) else {
                continue;
            };
            let (transform, velocity) = obstacle_pose(pose, index, *offset, motion, now);
            world.set_body_transform(*id, transform);
            world.set_body_velocity(*id, velocity);
        }
    }
}
