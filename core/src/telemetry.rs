//! Telemetry published to the visualization layer once per tick.

use crate::types::{SimTime, Tick};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TIME_FIELD: &str = "time";
pub const SCORE_FIELD: &str = "score";
pub const FINAL_FIELD: &str = "final";

/// The visualization collaborator: named text fields at screen positions.
pub trait Telemetry {
    fn add_text(&mut self, key: &str, x: u32, y: u32);
    fn update_text(&mut self, key: &str, text: String);
    /// Current text of a field, if it has been set.
    fn text(&self, key: &str) -> Option<&str>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextField {
    pub x:    u32,
    pub y:    u32,
    pub text: Option<String>,
}

/// In-memory overlay; what a renderer would draw.
#[derive(Debug, Clone, Default)]
pub struct TextOverlay {
    fields: BTreeMap<String, TextField>,
}

impl TextOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &BTreeMap<String, TextField> {
        &self.fields
    }
}

impl Telemetry for TextOverlay {
    fn add_text(&mut self, key: &str, x: u32, y: u32) {
        self.fields.insert(key.to_string(), TextField { x, y, text: None });
    }

    fn update_text(&mut self, key: &str, text: String) {
        match self.fields.get_mut(key) {
            Some(field) => field.text = Some(text),
            None => log::warn!("telemetry: update of unregistered field '{key}'"),
        }
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|f| f.text.as_deref())
    }
}

/// Register the three round fields.
pub fn register_round_fields(telemetry: &mut dyn Telemetry) {
    telemetry.add_text(TIME_FIELD, 5, 5);
    telemetry.add_text(SCORE_FIELD, 5, 10);
    telemetry.add_text(FINAL_FIELD, 5, 15);
}

/// Publish time, score and (once known) the final score.
pub fn publish_round_fields(
    telemetry:   &mut dyn Telemetry,
    time:        SimTime,
    score:       f64,
    final_score: Option<f64>,
) {
    telemetry.update_text(TIME_FIELD, format!("Time: {time}"));
    telemetry.update_text(SCORE_FIELD, format!("Score: {score}"));
    if let Some(final_score) = final_score {
        telemetry.update_text(FINAL_FIELD, format!("Final score: {final_score}"));
    }
}

/// Serialisable view of a round for tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryState {
    pub tick:          Tick,
    pub time:          SimTime,
    pub score:         f64,
    pub final_score:   Option<f64>,
    pub forfeited:     bool,
    pub ball_attempts: u32,
    pub phase:         String,
}
