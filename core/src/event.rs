//! Round events — the structured record of everything that affects the score.
//!
//! RULE: Every score mutation is carried by exactly one event, and
//! `score_delta()` of that event is the mutation. The log line and the
//! event are emitted together.

use crate::{
    config::Difficulty,
    types::{RunId, SimTime, Tick},
};
use serde::{Deserialize, Serialize};

/// Why the ball was put back on its spawn pose.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RespawnCause {
    Goal,
    IdleTimeout,
    FellOff,
}

/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundEvent {
    // ── Round lifecycle ────────────────────────────
    RunInitialized {
        run_id:     RunId,
        seed:       u64,
        difficulty: Difficulty,
    },
    RoundCompleted {
        tick:        Tick,
        time:        SimTime,
        final_score: f64,
        forfeited:   bool,
    },

    // ── Controller budget ──────────────────────────
    ControllerFaulted {
        tick:    Tick,
        time:    SimTime,
        message: String,
    },
    /// Controller used more than the warning budget in one window.
    ControllerOverBudget {
        tick:            Tick,
        time:            SimTime,
        controller_time: f64,
        penalty:         f64,
    },
    Forfeited {
        tick:            Tick,
        time:            SimTime,
        controller_time: f64,
        penalty:         f64,
    },

    // ── Limit violations ───────────────────────────
    JointLimitViolated {
        tick:    Tick,
        time:    SimTime,
        dof:     usize,
        value:   f64,
        min:     f64,
        max:     f64,
        penalty: f64,
    },
    VelocityLimitViolated {
        tick:    Tick,
        time:    SimTime,
        dof:     usize,
        value:   f64,
        limit:   f64,
        penalty: f64,
    },
    TorqueLimitViolated {
        tick:    Tick,
        time:    SimTime,
        dof:     usize,
        value:   f64,
        limit:   f64,
        penalty: f64,
    },
    TerrainContact {
        tick:    Tick,
        time:    SimTime,
        penalty: f64,
    },

    // ── Ball ───────────────────────────────────────
    /// First robot contact with the ball since it last spawned.
    BallTouched {
        tick:    Tick,
        time:    SimTime,
        attempt: u32,
    },
    GoalScored {
        tick:    Tick,
        time:    SimTime,
        attempt: u32,
        points:  f64,
    },
    BallRespawned {
        tick:     Tick,
        time:     SimTime,
        /// Attempt counter after the respawn.
        attempts: u32,
        causes:   Vec<RespawnCause>,
    },
}

impl RoundEvent {
    /// The score change this event carries.
    pub fn score_delta(&self) -> f64 {
        match self {
            Self::ControllerOverBudget { penalty, .. }
            | Self::Forfeited { penalty, .. }
            | Self::JointLimitViolated { penalty, .. }
            | Self::VelocityLimitViolated { penalty, .. }
            | Self::TorqueLimitViolated { penalty, .. }
            | Self::TerrainContact { penalty, .. } => -penalty,
            Self::GoalScored { points, .. } => *points,
            _ => 0.0,
        }
    }

    /// Stable name for the event_type column of the event log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. }        => "run_initialized",
            Self::RoundCompleted { .. }        => "round_completed",
            Self::ControllerFaulted { .. }     => "controller_faulted",
            Self::ControllerOverBudget { .. }  => "controller_over_budget",
            Self::Forfeited { .. }             => "forfeited",
            Self::JointLimitViolated { .. }    => "joint_limit_violated",
            Self::VelocityLimitViolated { .. } => "velocity_limit_violated",
            Self::TorqueLimitViolated { .. }   => "torque_limit_violated",
            Self::TerrainContact { .. }        => "terrain_contact",
            Self::BallTouched { .. }           => "ball_touched",
            Self::GoalScored { .. }            => "goal_scored",
            Self::BallRespawned { .. }         => "ball_respawned",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:          Option<i64>,
    pub run_id:      RunId,
    pub tick:        Tick,
    pub sim_time:    SimTime,
    pub event_type:  String,
    pub score_delta: f64,
    pub payload:     String, // JSON-serialized RoundEvent
}
