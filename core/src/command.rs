//! Robot commands and the control interface handed to the controller.
//!
//! RULE: A controller never touches the physics world directly.
//! It writes into a CommandBuffer; the round loop applies the buffered
//! command only when the controller returned Ok.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum RobotCommand {
    /// Drive joints at `dq` for `duration` seconds, then hold.
    Velocity { dq: Vec<f64>, duration: f64 },
    /// Track a joint configuration without exceeding velocity limits.
    PositionTarget { q: Vec<f64> },
    /// Apply raw joint torques until the next command.
    Torque { torque: Vec<f64> },
}

impl RobotCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Velocity { .. }       => "velocity",
            Self::PositionTarget { .. } => "position_target",
            Self::Torque { .. }         => "torque",
        }
    }
}

/// Per-tick control interface: sensed joint state in, at most one command out.
/// Issuing several commands in one tick keeps only the last.
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    sensed_position: Vec<f64>,
    sensed_velocity: Vec<f64>,
    pending:         Option<RobotCommand>,
}

impl CommandBuffer {
    pub fn new(sensed_position: Vec<f64>, sensed_velocity: Vec<f64>) -> Self {
        Self {
            sensed_position,
            sensed_velocity,
            pending: None,
        }
    }

    pub fn sensed_position(&self) -> &[f64] {
        &self.sensed_position
    }

    pub fn sensed_velocity(&self) -> &[f64] {
        &self.sensed_velocity
    }

    pub fn joint_count(&self) -> usize {
        self.sensed_position.len()
    }

    pub fn set_velocity(&mut self, dq: &[f64], duration: f64) {
        self.pending = Some(RobotCommand::Velocity { dq: dq.to_vec(), duration });
    }

    pub fn set_position_target(&mut self, q: &[f64]) {
        self.pending = Some(RobotCommand::PositionTarget { q: q.to_vec() });
    }

    pub fn set_torque(&mut self, torque: &[f64]) {
        self.pending = Some(RobotCommand::Torque { torque: torque.to_vec() });
    }

    pub fn pending(&self) -> Option<&RobotCommand> {
        self.pending.as_ref()
    }

    pub fn into_command(self) -> Option<RobotCommand> {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_command_wins() {
        let mut buffer = CommandBuffer::new(vec![0.0; 3], vec![0.0; 3]);
        buffer.set_velocity(&[1.0, 0.0, 0.0], 0.5);
        buffer.set_torque(&[0.0, 2.0, 0.0]);
        assert_eq!(
            buffer.into_command(),
            Some(RobotCommand::Torque { torque: vec![0.0, 2.0, 0.0] })
        );
    }

    #[test]
    fn empty_buffer_yields_no_command() {
        let buffer = CommandBuffer::new(vec![0.1, 0.2], vec![0.0, 0.0]);
        assert_eq!(buffer.joint_count(), 2);
        assert!(buffer.pending().is_none());
        assert!(buffer.into_command().is_none());
    }
}
