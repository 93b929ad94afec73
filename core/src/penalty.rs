//! Controller time budget, accounted over fixed penalty windows.
//!
//! Controller wall-clock time is summed as a Duration (integer nanoseconds)
//! so window totals compare exactly against the budgets.

use crate::{config::RoundConfig, types::SimTime};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of closing a penalty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetVerdict {
    WithinBudget { spent: Duration },
    Warning { spent: Duration },
    Forfeit { spent: Duration },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PenaltyWindow {
    /// Controller time spent since the window opened. Never negative.
    pub controller_time: Duration,
    /// Simulated time the current window opened.
    pub last_eval_time:  SimTime,
}

impl PenaltyWindow {
    pub fn record(&mut self, elapsed: Duration) {
        self.controller_time = self.controller_time.saturating_add(elapsed);
    }

    /// Close the window if `now` is past its end, returning the verdict.
    /// Closing always resets the accumulator and reopens the window at `now`.
    pub fn evaluate(&mut self, now: SimTime, config: &RoundConfig) -> Option<BudgetVerdict> {
        if now <= self.last_eval_time + config.penalty_window.as_secs_f64() {
            return None;
        }
        let spent = std::mem::take(&mut self.controller_time);
        self.last_eval_time = now;

        let verdict = if spent >= config.controller_forfeit_budget {
            BudgetVerdict::Forfeit { spent }
        } else if spent >= config.controller_warn_budget {
            BudgetVerdict::Warning { spent }
        } else {
            BudgetVerdict::WithinBudget { spent }
        };
        Some(verdict)
    }
}
