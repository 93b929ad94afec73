//! round-runner: headless round runner for the supervisor core.
//!
//! Usage:
//!   round-runner --seed 12345 --difficulty hard --controller sweep --db run.db
//!   round-runner --seed 12345 --scenario field.json --ticks 500
//!   round-runner --seed 12345 --pixel-noise 1.5
//!   round-runner --seed 12345 --ipc-mode

use anyhow::{Context, Result};
use std::env;
use std::io::{self, BufRead, Write};
use supervisor_core::{
    config::{Difficulty, RoundConfig, RunSettings},
    controller::{Controller, IdleController, SweepController},
    engine::RoundLoop,
    scenario::Scenario,
    store::RoundStore,
    telemetry::TelemetryState,
};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick { count: u64 },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ticks = args
        .windows(2)
        .find(|w| w[0] == "--ticks")
        .and_then(|w| w[1].parse::<u64>().ok());
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let omniscient = args.iter().any(|a| a == "--omniscient");
    let pixel_noise = parse_arg(&args, "--pixel-noise", 0.0f64);
    let difficulty_arg = string_arg(&args, "--difficulty")
        .map(str::parse::<Difficulty>)
        .transpose()?;
    let controller_name = string_arg(&args, "--controller").unwrap_or("idle");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");

    let scenario = match string_arg(&args, "--scenario") {
        Some(path) => Scenario::load(path)?,
        None => Scenario::default_field(),
    };

    // --difficulty wins over whatever the config file says.
    let mut config = match string_arg(&args, "--config") {
        Some(path) => RoundConfig::load(path)?,
        None => RoundConfig::default(),
    };
    if let Some(difficulty) = difficulty_arg {
        config.difficulty = difficulty;
    }
    let difficulty = config.difficulty;
    let settings = RunSettings {
        difficulty,
        random_seed: seed,
        omniscient_sensor: omniscient,
        pixel_noise,
        ..RunSettings::default()
    };

    if !ipc_mode {
        println!("round-runner");
        println!("  seed:        {seed}");
        println!("  difficulty:  {}", difficulty.name());
        println!("  duration:    {}s", config.round_duration());
        println!("  scenario:    {}", scenario.name);
        println!("  controller:  {controller_name}");
        println!("  db:          {db}");
        println!();
    }

    let store = RoundStore::open(db)?;
    store.migrate()?;

    let run_id = format!("run-{seed}-{}", uuid::Uuid::new_v4());
    let controller = build_controller(controller_name)?;
    let mut round = RoundLoop::build_with_config(
        run_id.clone(),
        &settings,
        config,
        &scenario,
        controller,
        store,
    )
    .context("failed to build round")?;
    log::info!("Round {run_id} built on '{}'", scenario.name);

    if ipc_mode {
        run_ipc_loop(&mut round)?;
    } else {
        match ticks {
            Some(n) => {
                round.run_ticks(n)?;
            }
            None => {
                round.run_to_completion()?;
            }
        }
        print_summary(&round, &run_id)?;
    }

    Ok(())
}

fn build_controller(name: &str) -> Result<Box<dyn Controller>> {
    match name {
        "idle" => Ok(Box::new(IdleController)),
        "sweep" => Ok(Box::new(SweepController::default())),
        other => anyhow::bail!("unknown controller '{other}' (expected idle or sweep)"),
    }
}

fn run_ipc_loop(round: &mut RoundLoop) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Tick { count } => {
                round.run_ticks(count)?;
                write_state(&mut stdout, &round.telemetry_state())?;
            }
            IpcCommand::GetState => {
                write_state(&mut stdout, &round.telemetry_state())?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn write_state(out: &mut impl Write, state: &TelemetryState) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string(state)?)?;
    Ok(())
}

fn print_summary(round: &RoundLoop, run_id: &str) -> Result<()> {
    let store = round.store();
    let state = round.telemetry_state();

    println!("=== ROUND SUMMARY ===");
    println!("  run_id:         {run_id}");
    println!("  final tick:     {}", state.tick);
    println!("  sim time:       {:.2}s", state.time);
    println!("  phase:          {}", state.phase);
    println!("  score:          {:.2}", state.score);
    match state.final_score {
        Some(score) => println!("  final score:    {score:.2}"),
        None => println!("  final score:    (round still running)"),
    }
    println!("  ball attempts:  {}", state.ball_attempts);
    println!("  forfeited:      {}", state.forfeited);
    println!("  events logged:  {}", store.event_count(run_id)?);

    println!();
    println!("=== SCORING EVENTS ===");
    for event_type in [
        "goal_scored",
        "ball_respawned",
        "joint_limit_violated",
        "velocity_limit_violated",
        "torque_limit_violated",
        "terrain_contact",
        "controller_over_budget",
        "controller_faulted",
    ] {
        let count = store.event_count_by_type(run_id, event_type)?;
        if count > 0 {
            println!("  {event_type:<24} {count}");
        }
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
