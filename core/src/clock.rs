//! Round clock (tick state and pause) plus the wall clocks used
//! to time the external controller.

use crate::types::{RunId, Tick};
use serde::{Deserialize, Serialize};
use std::{
    cell::Cell,
    rc::Rc,
    time::{Duration, Instant},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundClock {
    pub run_id:       RunId,
    pub current_tick: Tick,
    pub paused:       bool,
}

impl RoundClock {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            current_tick: 0,
            paused: true,
        }
    }

    /// Advance one tick. Returns the new tick number.
    /// Panics if called while paused. Callers must check.
    pub fn advance(&mut self) -> Tick {
        assert!(!self.paused, "advance() called on paused clock");
        self.current_tick += 1;
        self.current_tick
    }

    pub fn pause(&mut self)  { self.paused = true;  }
    pub fn resume(&mut self) { self.paused = false; }
}

/// Source of wall-clock time for measuring controller latency.
pub trait WallClock {
    /// Monotonic time since an arbitrary origin.
    fn now(&self) -> Duration;
}

/// Real monotonic clock.
pub struct SystemWallClock {
    origin: Instant,
}

impl SystemWallClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemWallClock {
    fn default() -> Self { Self::new() }
}

impl WallClock for SystemWallClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to. Clones share the same time, so a
/// test controller can "spend" latency that the round loop then measures.
#[derive(Debug, Clone, Default)]
pub struct ManualWallClock {
    now: Rc<Cell<Duration>>,
}

impl ManualWallClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl WallClock for ManualWallClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}
