//! Joint position, velocity and torque limit checks.
//!
//! Each category reports at most its first violating index per tick.
//! Index ranges, with `n` the number of checked joints (7 by default):
//!   - position: DOFs 0..n against [qmin, qmax]
//!   - velocity: DOFs 1..n against vmax
//!   - torque:   torque[i] for i in 0..n-1 against tmax[i + 1]
//! The torque offset is deliberate and must stay.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    JointPosition,
    Velocity,
    Torque,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitViolation {
    pub kind:  LimitKind,
    pub dof:   usize,
    pub value: f64,
    /// Lower bound for positions; the negated magnitude limit otherwise.
    pub min:   f64,
    pub max:   f64,
}

/// One tick's worth of joint state and limits for a robot.
#[derive(Debug, Clone, Copy)]
pub struct JointSample<'a> {
    pub positions:       &'a [f64],
    pub velocities:      &'a [f64],
    pub torques:         &'a [f64],
    pub joint_min:       &'a [f64],
    pub joint_max:       &'a [f64],
    pub velocity_limits: &'a [f64],
    pub torque_limits:   &'a [f64],
}

impl JointSample<'_> {
    /// All violations this tick, at most one per kind, in kind order.
    pub fn violations(&self, checked_joints: usize) -> Vec<LimitViolation> {
        [
            self.position_violation(checked_joints),
            self.velocity_violation(checked_joints),
            self.torque_violation(checked_joints),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn position_violation(&self, n: usize) -> Option<LimitViolation> {
        (0..n).find_map(|i| {
            let (q, lo, hi) = (
                *self.positions.get(i)?,
                *self.joint_min.get(i)?,
                *self.joint_max.get(i)?,
            );
            (q < lo || q > hi).then_some(LimitViolation {
                kind: LimitKind::JointPosition,
                dof: i,
                value: q,
                min: lo,
                max: hi,
            })
        })
    }

    fn velocity_violation(&self, n: usize) -> Option<LimitViolation> {
        (1..n).find_map(|i| {
            let (v, vmax) = (*self.velocities.get(i)?, *self.velocity_limits.get(i)?);
            (v.abs() > vmax).then_some(LimitViolation {
                kind: LimitKind::Velocity,
                dof: i,
                value: v,
                min: -vmax,
                max: vmax,
            })
        })
    }

    fn torque_violation(&self, n: usize) -> Option<LimitViolation> {
        (0..n.saturating_sub(1)).find_map(|i| {
            let (t, tmax) = (*self.torques.get(i)?, *self.torque_limits.get(i + 1)?);
            (t.abs() > tmax).then_some(LimitViolation {
                kind: LimitKind::Torque,
                dof: i,
                value: t,
                min: -tmax,
                max: tmax,
            })
        })
    }
}
