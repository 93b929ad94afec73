//! Supervisor core: scores one robot-arena round tick by tick.
//!
//! The round loop times an external controller, advances a physics world,
//! and lets the supervisor apply penalties, referee the ball and script the
//! obstacles. Every score change lands in the SQLite event log.

pub mod arena;
pub mod ball;
pub mod clock;
pub mod command;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod event;
pub mod limits;
pub mod obstacles;
pub mod penalty;
pub mod rng;
pub mod scenario;
pub mod sensor;
pub mod snapshot;
pub mod store;
pub mod supervisor;
pub mod telemetry;
pub mod types;
pub mod world;
