#![deny(warnings)]

//! Headless runner: starts a game, plays it to the end with an autopilot
//! policy and prints the final report as JSON.

mod autopilot;

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, Utc};
use leo_core::{EngineConfig, Scenario, SeededRandom};
use leo_sessions::SessionStore;
use leo_sim::Engine;
use rust_decimal::Decimal;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use autopilot::Policy;

/// Constellation size used when `--satellites` is not given.
const DEFAULT_SATELLITES: u32 = 4;
const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Default)]
struct Args {
    scenario: Option<String>,
    budget: Option<String>,
    satellites: Option<u32>,
    seed: Option<u64>,
    policy: Option<String>,
    config: Option<String>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => args.scenario = it.next(),
            "--budget" => args.budget = it.next(),
            "--satellites" => args.satellites = it.next().and_then(|s| s.parse().ok()),
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--policy" => args.policy = it.next(),
            "--config" => args.config = it.next(),
            _ => {}
        }
    }
    args
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading config file {path}"))?;
    let cfg = EngineConfig::from_yaml_str(&text).with_context(|| format!("parsing {path}"))?;
    info!(path, "loaded engine config");
    Ok(cfg)
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args();
    info!(?args, "starting CLI");

    let engine = Engine::new(load_config(args.config.as_deref())?)?;
    let scenario: Scenario = args.scenario.as_deref().unwrap_or("operator").parse()?;
    let budget = match args.budget.as_deref() {
        Some(b) => b
            .parse::<Decimal>()
            .with_context(|| format!("invalid budget '{b}'"))?,
        None => engine.config().scenario(scenario).default_budget,
    };
    let policy: Policy = args
        .policy
        .as_deref()
        .unwrap_or("eol-riskiest")
        .parse()
        .map_err(|e: String| anyhow!(e))?;

    let mut rng = SeededRandom::new(args.seed.unwrap_or(DEFAULT_SEED));
    let state = engine.start(
        scenario,
        budget,
        args.satellites.unwrap_or(DEFAULT_SATELLITES),
        &mut rng,
    )?;
    let id = state.id.clone();

    let mut sessions = SessionStore::new(Duration::minutes(30));
    sessions.insert(state, Utc::now())?;

    loop {
        let current = sessions.get(&id, Utc::now())?;
        if current.is_complete() {
            break;
        }
        let actions = policy.plan(&engine, current);
        debug!(game_id = %id, turn = current.turn, ?actions, "autopilot orders");
        let next = sessions.step(&engine, &id, &actions, &mut rng, Utc::now())?;
        info!(
            game_id = %id,
            turn = next.turn - 1,
            budget = %next.budget,
            score = next.score,
            collisions = next.collisions,
            "turn played"
        );
    }

    let final_state = sessions
        .remove(&id)
        .ok_or_else(|| anyhow!("session {id} vanished before the report"))?;
    let report = leo_report::summarize(&final_state);
    info!(game_id = %id, tier = report.tier.label(), "game finished");
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
