//! ArenaWorld — a small headless physics sandbox implementing PhysicsWorld.
//!
//! Deliberately simple: rigid objects are spheres under gravity that roll
//! on the highest terrain slab while inside the field rectangle and fall
//! through it outside; robot joints integrate their commanded drive
//! directly; robot links are static contact markers.
//!
//! Contacts are recomputed at the end of every step for each pair with
//! feedback enabled, from proximity plus any contact registered by a
//! script since the previous step.

use crate::{
    command::RobotCommand,
    error::RoundResult,
    scenario::Scenario,
    types::{add, distance, scale, BodyId, RigidTransform, SimTime, Twist},
    world::PhysicsWorld,
};
use std::collections::BTreeSet;

/// Handle returned for out-of-range lookups. Never refers to a body.
pub const NO_BODY: BodyId = BodyId(u32::MAX);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    RigidObject,
    Terrain,
    RobotLink,
}

#[derive(Debug, Clone)]
struct Body {
    kind:      BodyKind,
    transform: RigidTransform,
    velocity:  Twist,
    enabled:   bool,
    radius:    f64,
}

#[derive(Debug, Clone, PartialEq)]
enum Drive {
    Idle,
    Velocity { dq: Vec<f64>, remaining: f64 },
    PositionTarget { q: Vec<f64> },
    Torque { torque: Vec<f64> },
}

#[derive(Debug, Clone)]
struct ArenaRobot {
    q:      Vec<f64>,
    dq:     Vec<f64>,
    torque: Vec<f64>,
    qmin:   Vec<f64>,
    qmax:   Vec<f64>,
    vmax:   Vec<f64>,
    tmax:   Vec<f64>,
    links:  Vec<BodyId>,
    drive:  Drive,
}

impl ArenaRobot {
    fn step(&mut self, dt: SimTime) {
        let n = self.q.len();
        let mut finished = false;
        match &mut self.drive {
            Drive::Idle => {
                self.dq.fill(0.0);
                self.torque.fill(0.0);
            }
            Drive::Velocity { dq, remaining } => {
                self.torque.fill(0.0);
                for i in 0..n {
                    self.dq[i] = dq.get(i).copied().unwrap_or(0.0);
                    self.q[i] += self.dq[i] * dt;
                }
                *remaining -= dt;
                finished = *remaining <= 0.0;
            }
            Drive::PositionTarget { q: target } => {
                self.torque.fill(0.0);
                for i in 0..n {
                    let goal = target.get(i).copied().unwrap_or(self.q[i]);
                    let wanted = if dt > 0.0 { (goal - self.q[i]) / dt } else { 0.0 };
                    let vmax = self.vmax[i].abs();
                    self.dq[i] = wanted.clamp(-vmax, vmax);
                    self.q[i] += self.dq[i] * dt;
                }
            }
            Drive::Torque { torque } => {
                // Unit inertia: torque integrates straight into velocity.
                for i in 0..n {
                    self.torque[i] = torque.get(i).copied().unwrap_or(0.0);
                    self.dq[i] += self.torque[i] * dt;
                    self.q[i] += self.dq[i] * dt;
                }
            }
        }
        if finished {
            self.drive = Drive::Idle;
        }
    }
}

pub struct ArenaWorld {
    time:               SimTime,
    gravity:            f64,
    rolling_friction:   f64,
    field_half_extents: [f64; 2],
    bodies:             Vec<Body>,
    rigid_objects:      Vec<BodyId>,
    terrains:           Vec<BodyId>,
    robots:             Vec<ArenaRobot>,
    feedback:           BTreeSet<(BodyId, BodyId)>,
    contacts:           BTreeSet<(BodyId, BodyId)>,
    scripted_contacts:  BTreeSet<(BodyId, BodyId)>,
}

fn pair(a: BodyId, b: BodyId) -> (BodyId, BodyId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl ArenaWorld {
    /// Build the world described by `scenario`. The scenario is validated first.
    pub fn from_scenario(scenario: &Scenario) -> RoundResult<Self> {
        scenario.validate()?;

        let mut world = Self {
            time:               0.0,
            gravity:            scenario.gravity,
            rolling_friction:   scenario.rolling_friction,
            field_half_extents: scenario.field_half_extents,
            bodies:             Vec::new(),
            rigid_objects:      Vec::new(),
            terrains:           Vec::new(),
            robots:             Vec::new(),
            feedback:           BTreeSet::new(),
            contacts:           BTreeSet::new(),
            scripted_contacts:  BTreeSet::new(),
        };

        for object in &scenario.rigid_objects {
            let id = world.push_body(BodyKind::RigidObject, object.transform, object.radius);
            world.rigid_objects.push(id);
        }
        for terrain in &scenario.terrains {
            let slab = RigidTransform::from_translation([0.0, 0.0, terrain.height]);
            let id = world.push_body(BodyKind::Terrain, slab, 0.0);
            world.terrains.push(id);
        }

        let spec = &scenario.robot;
        let links = spec
            .links
            .iter()
            .map(|link| {
                world.push_body(
                    BodyKind::RobotLink,
                    RigidTransform::from_translation(link.position),
                    link.radius,
                )
            })
            .collect();
        let n = spec.joint_count();
        world.robots.push(ArenaRobot {
            q:      spec.initial_config.clone(),
            dq:     vec![0.0; n],
            torque: vec![0.0; n],
            qmin:   spec.joint_min.clone(),
            qmax:   spec.joint_max.clone(),
            vmax:   spec.velocity_limits.clone(),
            tmax:   spec.torque_limits.clone(),
            links,
            drive:  Drive::Idle,
        });

        log::debug!(
            "ArenaWorld built from '{}': {} bodies",
            scenario.name,
            world.bodies.len()
        );
        Ok(world)
    }

    fn push_body(&mut self, kind: BodyKind, transform: RigidTransform, radius: f64) -> BodyId {
        let id = BodyId(self.bodies.len() as u32);
        self.bodies.push(Body {
            kind,
            transform,
            velocity: Twist::ZERO,
            enabled: kind == BodyKind::RigidObject,
            radius,
        });
        id
    }

    fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id.0 as usize)
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        let body = self.bodies.get_mut(id.0 as usize);
        if body.is_none() {
            log::warn!("ArenaWorld: write to unknown body {id:?} ignored");
        }
        body
    }

    pub fn body_enabled(&self, id: BodyId) -> bool {
        self.body(id).is_some_and(|b| b.enabled)
    }

    /// Report a contact between `a` and `b` during the next step.
    pub fn register_contact(&mut self, a: BodyId, b: BodyId) {
        self.scripted_contacts.insert(pair(a, b));
    }

    /// Overwrite joint positions; they persist while the robot holds still.
    pub fn set_joint_positions(&mut self, robot: usize, q: &[f64]) {
        if let Some(r) = self.robots.get_mut(robot) {
            for (dst, src) in r.q.iter_mut().zip(q) {
                *dst = *src;
            }
        }
    }

    fn floor_height(&self) -> Option<f64> {
        self.terrains
            .iter()
            .filter_map(|id| self.body(*id))
            .map(|b| b.transform.translation[2])
            .reduce(f64::max)
    }

    fn on_field(&self, x: f64, y: f64) -> bool {
        x.abs() <= self.field_half_extents[0] && y.abs() <= self.field_half_extents[1]
    }

    fn integrate_rigid_objects(&mut self, dt: SimTime) {
        let floor = self.floor_height();
        let friction = (1.0 - self.rolling_friction * dt).max(0.0);
        for index in 0..self.rigid_objects.len() {
            let id = self.rigid_objects[index];
            let Some(body) = self.bodies.get(id.0 as usize) else { continue };
            if !body.enabled {
                continue;
            }
            let mut velocity = body.velocity.linear;
            velocity[2] -= self.gravity * dt;
            let mut position = add(body.transform.translation, scale(velocity, dt));

            if let Some(floor) = floor {
                let rest = floor + body.radius;
                if self.on_field(position[0], position[1]) && position[2] < rest {
                    position[2] = rest;
                    velocity[2] = velocity[2].max(0.0);
                    velocity[0] *= friction;
                    velocity[1] *= friction;
                }
            }

            self.bounce_off_obstacles(index, &mut position, &mut velocity);

            if let Some(body) = self.bodies.get_mut(id.0 as usize) {
                body.transform.translation = position;
                body.velocity.linear = velocity;
            }
        }
    }

    /// Reflect the horizontal velocity of object `index` off any disabled
    /// (scripted) rigid object it overlaps.
    fn bounce_off_obstacles(&self, index: usize, position: &mut [f64; 3], velocity: &mut [f64; 3]) {
        let Some(me) = self.body(self.rigid_objects[index]) else { return };
        for (other_index, other_id) in self.rigid_objects.iter().enumerate() {
            if other_index == index {
                continue;
            }
            let Some(other) = self.body(*other_id) else { continue };
            if other.enabled {
                continue;
            }
            let reach = me.radius + other.radius;
            let gap = distance(*position, other.transform.translation);
            if gap >= reach || gap == 0.0 {
                continue;
            }
            let normal = [
                (position[0] - other.transform.translation[0]) / gap,
                (position[1] - other.transform.translation[1]) / gap,
            ];
            let approach = velocity[0] * normal[0] + velocity[1] * normal[1];
            if approach < 0.0 {
                velocity[0] -= 2.0 * approach * normal[0];
                velocity[1] -= 2.0 * approach * normal[1];
            }
        }
    }

    fn touching(&self, a: BodyId, b: BodyId) -> bool {
        let (Some(ba), Some(bb)) = (self.body(a), self.body(b)) else { return false };
        match (ba.kind, bb.kind) {
            (BodyKind::Terrain, BodyKind::Terrain) => false,
            (BodyKind::Terrain, _) => {
                bb.transform.translation[2] - bb.radius <= ba.transform.translation[2]
            }
            (_, BodyKind::Terrain) => {
                ba.transform.translation[2] - ba.radius <= bb.transform.translation[2]
            }
            _ => distance(ba.transform.translation, bb.transform.translation) <= ba.radius + bb.radius,
        }
    }

    fn refresh_contacts(&mut self) {
        let scripted = std::mem::take(&mut self.scripted_contacts);
        self.contacts = self
            .feedback
            .iter()
            .copied()
            .filter(|(a, b)| scripted.contains(&(*a, *b)) || self.touching(*a, *b))
            .collect();
    }
}

impl PhysicsWorld for ArenaWorld {
    fn sim_time(&self) -> SimTime {
        self.time
    }

    fn advance(&mut self, dt: SimTime) {
        self.time += dt;
        for robot in &mut self.robots {
            robot.step(dt);
        }
        self.integrate_rigid_objects(dt);
        self.refresh_contacts();
    }

    fn rigid_object_count(&self) -> usize {
        self.rigid_objects.len()
    }

    fn rigid_object_id(&self, index: usize) -> BodyId {
        self.rigid_objects.get(index).copied().unwrap_or(NO_BODY)
    }

    fn terrain_count(&self) -> usize {
        self.terrains.len()
    }

    fn terrain_id(&self, index: usize) -> BodyId {
        self.terrains.get(index).copied().unwrap_or(NO_BODY)
    }

    fn robot_count(&self) -> usize {
        self.robots.len()
    }

    fn robot_link_count(&self, robot: usize) -> usize {
        self.robots.get(robot).map_or(0, |r| r.links.len())
    }

    fn robot_link_id(&self, robot: usize, link: usize) -> BodyId {
        self.robots
            .get(robot)
            .and_then(|r| r.links.get(link))
            .copied()
            .unwrap_or(NO_BODY)
    }

    fn body_transform(&self, id: BodyId) -> RigidTransform {
        self.body(id).map(|b| b.transform).unwrap_or_default()
    }

    fn set_body_transform(&mut self, id: BodyId, transform: RigidTransform) {
        if let Some(body) = self.body_mut(id) {
            body.transform = transform;
        }
    }

    fn body_velocity(&self, id: BodyId) -> Twist {
        self.body(id).map(|b| b.velocity).unwrap_or_default()
    }

    fn set_body_velocity(&mut self, id: BodyId, velocity: Twist) {
        if let Some(body) = self.body_mut(id) {
            body.velocity = velocity;
        }
    }

    fn set_body_enabled(&mut self, id: BodyId, enabled: bool) {
        if let Some(body) = self.body_mut(id) {
            body.enabled = enabled;
        }
    }

    fn joint_positions(&self, robot: usize) -> &[f64] {
        self.robots.get(robot).map(|r| r.q.as_slice()).unwrap_or(&[])
    }

    fn joint_velocities(&self, robot: usize) -> &[f64] {
        self.robots.get(robot).map(|r| r.dq.as_slice()).unwrap_or(&[])
    }

    fn joint_torques(&self, robot: usize) -> &[f64] {
        self.robots.get(robot).map(|r| r.torque.as_slice()).unwrap_or(&[])
    }

    fn joint_limits(&self, robot: usize) -> (&[f64], &[f64]) {
        self.robots
            .get(robot)
            .map(|r| (r.qmin.as_slice(), r.qmax.as_slice()))
            .unwrap_or((&[], &[]))
    }

    fn velocity_limits(&self, robot: usize) -> &[f64] {
        self.robots.get(robot).map(|r| r.vmax.as_slice()).unwrap_or(&[])
    }

    fn torque_limits(&self, robot: usize) -> &[f64] {
        self.robots.get(robot).map(|r| r.tmax.as_slice()).unwrap_or(&[])
    }

    fn apply_command(&mut self, robot: usize, command: &RobotCommand) {
        let Some(r) = self.robots.get_mut(robot) else {
            log::warn!("ArenaWorld: command for unknown robot {robot} dropped");
            return;
        };
        r.drive = match command {
            RobotCommand::Velocity { dq, duration } => Drive::Velocity {
                dq:        dq.clone(),
                remaining: *duration,
            },
            RobotCommand::PositionTarget { q } => Drive::PositionTarget { q: q.clone() },
            RobotCommand::Torque { torque } => Drive::Torque { torque: torque.clone() },
        };
    }

    fn enable_contact_feedback(&mut self, a: BodyId, b: BodyId) {
        self.feedback.insert(pair(a, b));
    }

    fn had_contact(&self, a: BodyId, b: BodyId) -> bool {
        self.contacts.contains(&pair(a, b))
    }
}
