//! The pluggable robot controller.
//!
//! A controller sees elapsed time and sensor readings and writes at most
//! one command into the CommandBuffer. It may fail or take arbitrarily
//! long; the round loop times every call and never preempts it.

use crate::{
    command::CommandBuffer,
    error::ControllerFault,
    sensor::SensorReadings,
    types::SimTime,
};

pub trait Controller {
    fn name(&self) -> &str;

    /// Called once per tick, before physics advances.
    fn control(
        &mut self,
        dt: SimTime,
        robot: &mut CommandBuffer,
        readings: &SensorReadings,
    ) -> Result<(), ControllerFault>;
}

/// Controller that never commands anything.
#[derive(Debug, Default)]
pub struct IdleController;

impl Controller for IdleController {
    fn name(&self) -> &str {
        "idle"
    }

    fn control(
        &mut self,
        _dt: SimTime,
        _robot: &mut CommandBuffer,
        _readings: &SensorReadings,
    ) -> Result<(), ControllerFault> {
        Ok(())
    }
}

/// Sweeps every joint sinusoidally around where it started.
/// Peak joint speed is `speed`, so keep it under the velocity limits.
#[derive(Debug)]
pub struct SweepController {
    pub speed:  f64,
    pub period: SimTime,
    elapsed:    SimTime,
}

impl SweepController {
    pub fn new(speed: f64, period: SimTime) -> Self {
        Self { speed, period, elapsed: 0.0 }
    }
}

impl Default for SweepController {
    fn default() -> Self {
        Self::new(0.5, 4.0)
    }
}

impl Controller for SweepController {
    fn name(&self) -> &str {
        "sweep"
    }

    fn control(
        &mut self,
        dt: SimTime,
        robot: &mut CommandBuffer,
        _readings: &SensorReadings,
    ) -> Result<(), ControllerFault> {
        if self.period <= 0.0 {
            return Err(ControllerFault::new("sweep period must be positive"));
        }
        let omega = std::f64::consts::TAU / self.period;
        let dq: Vec<f64> = (0..robot.joint_count())
            .map(|i| self.speed * (omega * self.elapsed + i as f64).cos())
            .collect();
        robot.set_velocity(&dq, dt);
        self.elapsed += dt;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::RobotCommand;

    #[test]
    fn sweep_stays_under_its_speed() {
        let mut sweep = SweepController::new(0.5, 2.0);
        for _ in 0..100 {
            let mut buffer = CommandBuffer::new(vec![0.0; 7], vec![0.0; 7]);
            sweep.control(0.02, &mut buffer, &SensorReadings::new()).unwrap();
            let Some(RobotCommand::Velocity { dq, duration }) = buffer.into_command() else {
                panic!("sweep must issue a velocity command");
            };
            assert_eq!(duration, 0.02);
            assert!(dq.iter().all(|v| v.abs() <= 0.5));
        }
    }

    #[test]
    fn zero_period_is_a_fault() {
        let mut sweep = SweepController::new(0.5, 0.0);
        let mut buffer = CommandBuffer::default();
        assert!(sweep.control(0.02, &mut buffer, &SensorReadings::new()).is_err());
    }
}
