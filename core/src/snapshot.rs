//! Snapshot serialization — round state to/from JSON.
//!
//! A snapshot is taken every SNAPSHOT_INTERVAL ticks and captures the
//! clock and the complete supervisor state at that tick.

use crate::{
    clock::RoundClock,
    supervisor::SupervisorState,
    types::{RunId, SimTime, Tick},
};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_INTERVAL: Tick = 50; // one simulated second at the default timestep

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub run_id:     RunId,
    pub tick:       Tick,
    pub sim_time:   SimTime,
    pub clock:      RoundClock,
    pub supervisor: SupervisorState,
}
