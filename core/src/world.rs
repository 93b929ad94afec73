//! The physics world seam.
//!
//! RULE: The supervisor has no physics of its own. Everything it reads
//! or writes about bodies, joints and contacts goes through PhysicsWorld.
//! Indices (rigid object, terrain, robot, link) are positional; bodies are
//! addressed by the opaque BodyId the world hands out.

use crate::{
    command::RobotCommand,
    types::{BodyId, RigidTransform, SimTime, Twist},
};

pub trait PhysicsWorld {
    /// Simulated seconds since the world was created.
    fn sim_time(&self) -> SimTime;

    /// Integrate one fixed step of `dt` seconds.
    fn advance(&mut self, dt: SimTime);

    // ── Inventory ──────────────────────────────────────────────

    fn rigid_object_count(&self) -> usize;
    fn rigid_object_id(&self, index: usize) -> BodyId;
    fn terrain_count(&self) -> usize;
    fn terrain_id(&self, index: usize) -> BodyId;
    fn robot_count(&self) -> usize;
    fn robot_link_count(&self, robot: usize) -> usize;
    fn robot_link_id(&self, robot: usize, link: usize) -> BodyId;

    // ── Bodies ─────────────────────────────────────────────────

    fn body_transform(&self, id: BodyId) -> RigidTransform;
    fn set_body_transform(&mut self, id: BodyId, transform: RigidTransform);
    fn body_velocity(&self, id: BodyId) -> Twist;
    fn set_body_velocity(&mut self, id: BodyId, velocity: Twist);
    /// Disabled bodies are not integrated; they only move when set.
    fn set_body_enabled(&mut self, id: BodyId, enabled: bool);

    // ── Robot joints ───────────────────────────────────────────

    fn joint_positions(&self, robot: usize) -> &[f64];
    fn joint_velocities(&self, robot: usize) -> &[f64];
    fn joint_torques(&self, robot: usize) -> &[f64];
    /// (lower, upper) position limits.
    fn joint_limits(&self, robot: usize) -> (&[f64], &[f64]);
    fn velocity_limits(&self, robot: usize) -> &[f64];
    fn torque_limits(&self, robot: usize) -> &[f64];

    /// Hand a controller command to the robot's motor controller.
    fn apply_command(&mut self, robot: usize, command: &RobotCommand);

    // ── Contacts ───────────────────────────────────────────────

    /// Contact queries for a pair are meaningless until this is called.
    fn enable_contact_feedback(&mut self, a: BodyId, b: BodyId);
    /// Whether `a` and `b` touched during the last step.
    fn had_contact(&self, a: BodyId, b: BodyId) -> bool;

    // ── Provided helpers ───────────────────────────────────────

    fn rigid_object_ids(&self) -> Vec<BodyId> {
        (0..self.rigid_object_count()).map(|i| self.rigid_object_id(i)).collect()
    }

    fn terrain_ids(&self) -> Vec<BodyId> {
        (0..self.terrain_count()).map(|i| self.terrain_id(i)).collect()
    }

    fn robot_link_ids(&self, robot: usize) -> Vec<BodyId> {
        (0..self.robot_link_count(robot))
            .map(|link| self.robot_link_id(robot, link))
            .collect()
    }
}
