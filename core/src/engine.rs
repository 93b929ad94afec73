//! The round loop — one fixed-timestep tick at a time.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Sensors emulate one reading each from the current world state
//!   2. Controller runs (timed on the wall clock, fail-soft)
//!   3. The controller's command is applied (only if it returned Ok)
//!   4. Physics advances by dt
//!   5. Supervisor pass (penalties, limits, ball, obstacles)
//!   6. Final score snapshot once sim time reaches the round duration
//!   7. Events persisted, snapshot every SNAPSHOT_INTERVAL ticks
//!   8. Telemetry published
//!
//! RULES:
//!   - A controller fault or panic never aborts the tick.
//!   - The controller's wall-clock time is charged whether it failed or not.
//!   - All randomness flows through the RngBank.
//!   - Every score change is recorded in the event log.

use crate::{
    arena::ArenaWorld,
    clock::{ManualWallClock, RoundClock, SystemWallClock, WallClock},
    command::CommandBuffer,
    config::{RoundConfig, RunSettings},
    controller::Controller,
    error::{ControllerFault, RoundError, RoundResult},
    event::{EventLogEntry, RoundEvent},
    rng::{RngBank, RngSlot},
    scenario::Scenario,
    sensor::{SensorBank, SensorReadings},
    snapshot::{RoundSnapshot, SNAPSHOT_INTERVAL},
    store::RoundStore,
    supervisor::{Supervisor, ROBOT},
    telemetry::{publish_round_fields, register_round_fields, Telemetry, TelemetryState, TextOverlay},
    types::{RunId, SimTime, Tick},
    world::PhysicsWorld,
};
use std::panic::{self, AssertUnwindSafe};

/// Where a round stands. Forfeiture and completion are independent:
/// a forfeited round still completes when its clock runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Running,
    Forfeited,
    Complete { forfeited: bool },
}

impl RoundPhase {
    pub fn name(&self) -> &'static str {
        match self {
            RoundPhase::Running         => "running",
            RoundPhase::Forfeited       => "forfeited",
            RoundPhase::Complete { .. } => "complete",
        }
    }
}

pub struct RoundLoop<W: PhysicsWorld = ArenaWorld> {
    pub run_id:  RunId,
    pub clock:   RoundClock,
    seed:        u64,
    dt:          SimTime,
    world:       W,
    controller:  Box<dyn Controller>,
    sensors:     SensorBank,
    supervisor:  Supervisor,
    telemetry:   Box<dyn Telemetry>,
    wall_clock:  Box<dyn WallClock>,
    store:       RoundStore,
    initialized: bool,
}

impl<W: PhysicsWorld> RoundLoop<W> {
    /// Wire a round around an already-built world. The round row is
    /// inserted into the store immediately.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id:     RunId,
        seed:       u64,
        dt:         SimTime,
        config:     RoundConfig,
        mut world:  W,
        controller: Box<dyn Controller>,
        sensors:    SensorBank,
        store:      RoundStore,
    ) -> RoundResult<Self> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(RoundError::InvalidScenario {
                reason: format!("timestep must be positive, got {dt}"),
            });
        }

        store.insert_round(&run_id, seed, config.difficulty.name(), env!("CARGO_PKG_VERSION"))?;

        let rng = RngBank::new(seed).for_slot(RngSlot::Obstacles);
        let supervisor = Supervisor::new(&mut world, config, rng)?;

        let mut telemetry: Box<dyn Telemetry> = Box::new(TextOverlay::new());
        register_round_fields(telemetry.as_mut());

        log::info!(
            "Round {run_id} ready: seed {seed}, dt {dt}, controller '{}', sensors {:?}",
            controller.name(),
            sensors.names()
        );

        Ok(Self {
            clock: RoundClock::new(run_id.clone()),
            seed,
            dt,
            world,
            controller,
            sensors,
            supervisor,
            telemetry,
            wall_clock: Box::new(SystemWallClock::new()),
            store,
            initialized: false,
            run_id,
        })
    }

    /// Replace the wall clock used to time the controller.
    pub fn with_wall_clock(mut self, wall_clock: Box<dyn WallClock>) -> Self {
        self.wall_clock = wall_clock;
        self
    }

    /// Replace the telemetry sink. The round fields are registered on it.
    pub fn with_telemetry(mut self, mut telemetry: Box<dyn Telemetry>) -> Self {
        register_round_fields(telemetry.as_mut());
        self.telemetry = telemetry;
        self
    }

    /// Advance one tick. This is the core round step.
    /// Returns the events this tick produced, in the order they happened.
    pub fn tick(&mut self) -> RoundResult<Vec<RoundEvent>> {
        if !self.initialized {
            return Err(RoundError::RoundNotInitialized);
        }
        let tick = self.clock.advance();

        let readings = self.sensors.emulate_all(&self.world);
        let mut buffer = CommandBuffer::new(
            self.world.joint_positions(ROBOT).to_vec(),
            self.world.joint_velocities(ROBOT).to_vec(),
        );

        let started = self.wall_clock.now();
        let outcome = run_controller(self.controller.as_mut(), self.dt, &mut buffer, &readings);
        let elapsed = self.wall_clock.now().saturating_sub(started);

        let fault = match outcome {
            Ok(()) => {
                if let Some(command) = buffer.into_command() {
                    log::trace!("Tick {tick}: applying {} command", command.kind());
                    self.world.apply_command(ROBOT, &command);
                }
                None
            }
            Err(mut fault) => {
                fault.elapsed = elapsed;
                log::warn!("Controller '{}' faulted at tick {tick}: {fault}", self.controller.name());
                Some(fault)
            }
        };
        self.supervisor.record_controller_time(elapsed);

        self.world.advance(self.dt);

        // Every event of this tick carries the post-step time.
        let now = self.world.sim_time();
        let mut events = Vec::new();
        if let Some(fault) = fault {
            events.push(RoundEvent::ControllerFaulted { tick, time: now, message: fault.message });
        }
        events.extend(self.supervisor.update(&mut self.world, self.dt, tick));

        if now >= self.supervisor.config().round_duration() {
            if let Some(final_score) = self.supervisor.record_final_score() {
                let forfeited = self.supervisor.is_forfeited();
                log::info!("Round {} complete at {now:.2}s: final score {final_score}", self.run_id);
                self.store.record_final_score(&self.run_id, final_score)?;
                events.push(RoundEvent::RoundCompleted { tick, time: now, final_score, forfeited });
            }
        }

        for event in &events {
            self.persist(tick, now, event)?;
        }

        if tick.is_multiple_of(SNAPSHOT_INTERVAL) {
            self.take_snapshot(tick)?;
        }

        publish_round_fields(
            self.telemetry.as_mut(),
            now,
            self.supervisor.score(),
            self.supervisor.final_score(),
        );
        log::trace!("Tick {tick} published: t={now:.2} score={}", self.supervisor.score());

        Ok(events)
    }

    /// Run n ticks in a loop. Used for testing, fast-forward and IPC.
    pub fn run_ticks(&mut self, n: u64) -> RoundResult<Vec<RoundEvent>> {
        let mut events = self.initialize()?;
        self.clock.resume();
        for _ in 0..n {
            events.extend(self.tick()?);
        }
        self.clock.pause();
        Ok(events)
    }

    /// Tick until the final score is known and return it.
    pub fn run_to_completion(&mut self) -> RoundResult<f64> {
        if let Some(score) = self.supervisor.final_score() {
            return Ok(score);
        }
        self.initialize()?;
        self.clock.resume();
        let score = loop {
            self.tick()?;
            if let Some(score) = self.supervisor.final_score() {
                break score;
            }
        };
        self.clock.pause();
        Ok(score)
    }

    pub fn phase(&self) -> RoundPhase {
        let forfeited = self.supervisor.is_forfeited();
        match self.supervisor.final_score() {
            Some(_)           => RoundPhase::Complete { forfeited },
            None if forfeited => RoundPhase::Forfeited,
            None              => RoundPhase::Running,
        }
    }

    // ── Accessors ──────────────────────────────────────────────

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn dt(&self) -> SimTime {
        self.dt
    }

    pub fn sim_time(&self) -> SimTime {
        self.world.sim_time()
    }

    pub fn score(&self) -> f64 {
        self.supervisor.score()
    }

    pub fn final_score(&self) -> Option<f64> {
        self.supervisor.final_score()
    }

    pub fn ball_attempts(&self) -> u32 {
        self.supervisor.ball_attempts()
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    /// Scripts and tests poke the world between ticks through this.
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn store(&self) -> &RoundStore {
        &self.store
    }

    pub fn telemetry(&self) -> &dyn Telemetry {
        self.telemetry.as_ref()
    }

    pub fn telemetry_state(&self) -> TelemetryState {
        TelemetryState {
            tick:          self.clock.current_tick,
            time:          self.world.sim_time(),
            score:         self.supervisor.score(),
            final_score:   self.supervisor.final_score(),
            forfeited:     self.supervisor.is_forfeited(),
            ball_attempts: self.supervisor.ball_attempts(),
            phase:         self.phase().name().to_string(),
        }
    }

    /// Query events for a specific tick from the store.
    /// Used by the determinism test and replay tooling.
    pub fn store_events_for_tick(&self, tick: Tick) -> RoundResult<Vec<EventLogEntry>> {
        self.store.events_for_tick(&self.run_id, tick)
    }

    // ── Internals ──────────────────────────────────────────────

    /// Emit RunInitialized at tick 0 so seed differences are observable.
    fn initialize(&mut self) -> RoundResult<Vec<RoundEvent>> {
        if self.initialized {
            return Ok(Vec::new());
        }
        let event = RoundEvent::RunInitialized {
            run_id:     self.run_id.clone(),
            seed:       self.seed,
            difficulty: self.supervisor.config().difficulty,
        };
        self.persist(0, self.world.sim_time(), &event)?;
        self.initialized = true;
        Ok(vec![event])
    }

    fn persist(&self, tick: Tick, sim_time: SimTime, event: &RoundEvent) -> RoundResult<()> {
        let entry = EventLogEntry {
            id:          None,
            run_id:      self.run_id.clone(),
            tick,
            sim_time,
            event_type:  event.type_name().to_string(),
            score_delta: event.score_delta(),
            payload:     serde_json::to_string(event)?,
        };
        self.store.append_event(&entry)
    }

    fn take_snapshot(&self, tick: Tick) -> RoundResult<()> {
        let snapshot = RoundSnapshot {
            run_id:     self.run_id.clone(),
            tick,
            sim_time:   self.world.sim_time(),
            clock:      self.clock.clone(),
            supervisor: self.supervisor.state.clone(),
        };
        let json = serde_json::to_string(&snapshot)?;
        self.store.save_snapshot(&self.run_id, tick, &json)?;
        log::debug!("Snapshot saved at tick {tick}");
        Ok(())
    }
}

impl RoundLoop<ArenaWorld> {
    /// Build a fully wired round on the reference arena.
    /// Call this instead of new() when running a scenario file.
    pub fn build(
        run_id:     RunId,
        settings:   &RunSettings,
        scenario:   &Scenario,
        controller: Box<dyn Controller>,
        store:      RoundStore,
    ) -> RoundResult<Self> {
        Self::build_with_config(run_id, settings, settings.round_config(), scenario, controller, store)
    }

    /// Test round: default field, easy difficulty, in-memory store and a
    /// manual wall clock that never moves unless a test moves it.
    pub fn build_test(
        run_id:     RunId,
        seed:       u64,
        controller: Box<dyn Controller>,
    ) -> RoundResult<Self> {
        Self::build_test_with_config(run_id, seed, RoundConfig::default_test(), controller)
    }

    pub fn build_test_with_config(
        run_id:     RunId,
        seed:       u64,
        config:     RoundConfig,
        controller: Box<dyn Controller>,
    ) -> RoundResult<Self> {
        let store = RoundStore::in_memory()?;
        store.migrate()?;
        let settings = RunSettings {
            difficulty:  config.difficulty,
            random_seed: seed,
            ..RunSettings::default()
        };
        let round = Self::build_with_config(
            run_id,
            &settings,
            config,
            &Scenario::default_field(),
            controller,
            store,
        )?;
        Ok(round.with_wall_clock(Box::new(ManualWallClock::new())))
    }

    /// Like build(), with every round constant supplied by the caller.
    pub fn build_with_config(
        run_id:     RunId,
        settings:   &RunSettings,
        config:     RoundConfig,
        scenario:   &Scenario,
        controller: Box<dyn Controller>,
        store:      RoundStore,
    ) -> RoundResult<Self> {
        let world = ArenaWorld::from_scenario(scenario)?;
        let sensors = SensorBank::standard(
            settings.omniscient_sensor,
            settings.pixel_noise,
            &RngBank::new(settings.random_seed),
        );
        RoundLoop::new(
            run_id,
            settings.random_seed,
            settings.dt,
            config,
            world,
            controller,
            sensors,
            store,
        )
    }
}

/// Run the controller, turning a panic into a fault.
fn run_controller(
    controller: &mut dyn Controller,
    dt:         SimTime,
    buffer:     &mut CommandBuffer,
    readings:   &SensorReadings,
) -> Result<(), ControllerFault> {
    match panic::catch_unwind(AssertUnwindSafe(|| controller.control(dt, buffer, readings))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "controller panicked".to_string());
            Err(ControllerFault::new(format!("panic: {message}")))
        }
    }
}
