//! Random events rolled once per turn after the player's orders.

use leo_core::{EngineConfig, GameState, Mission, RandomSource};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Forest cover lost to one deforestation event, in percent.
const FOREST_COVER_LOSS_PCT: f64 = 5.0;

/// Outcome of the scenario event roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScenarioRoll {
    /// The event did not trigger.
    Quiet,
    /// The event would have fired without monitoring.
    Prevented,
    /// The event fired.
    Fired,
}

/// Roll a collision for every active satellite, in list order.
///
/// A satellite collides when the draw falls below its risk. Returns the
/// number of collisions.
pub(crate) fn roll_collisions<R: RandomSource + ?Sized>(
    cfg: &EngineConfig,
    state: &mut GameState,
    rng: &mut R,
) -> u32 {
    let mut hits = 0;
    for idx in 0..state.satellites.len() {
        if !state.satellites[idx].is_active() {
            continue;
        }
        let u = rng.next_f64();
        if u >= state.satellites[idx].risk {
            continue;
        }
        state.satellites[idx].destroy();
        state.collisions += 1;
        state.budget -= cfg.collision.damage_cost;
        state.score -= cfg.collision.score_penalty;
        let id = state.satellites[idx].id.clone();
        warn!(game_id = %state.id, sat_id = %id, turn = state.turn, "collision");
        state.log(format!("Collision: {id}"));
        hits += 1;
    }
    hits
}

/// Roll the scenario's negative event.
///
/// Monitoring scales the probability down. The monitoring bonus is credited
/// exactly when the draw lands between the reduced and the base probability.
pub(crate) fn roll_scenario_event<R: RandomSource + ?Sized>(
    cfg: &EngineConfig,
    state: &mut GameState,
    monitoring: bool,
    rng: &mut R,
) -> ScenarioRoll {
    let event = &cfg.scenario(state.scenario()).event;
    let base_p = event.probability;
    let p = if monitoring {
        base_p * cfg.monitoring.probability_factor
    } else {
        base_p
    };
    let u = rng.next_f64();
    if u < p {
        apply_scenario_event(state, event.severity);
        return ScenarioRoll::Fired;
    }
    if monitoring && u < base_p {
        state.score += cfg.monitoring.score_bonus;
        info!(game_id = %state.id, turn = state.turn, "monitoring prevented scenario event");
        state.log(format!("Monitoring prevented {}", event_name(&state.mission)));
        return ScenarioRoll::Prevented;
    }
    ScenarioRoll::Quiet
}

fn event_name(mission: &Mission) -> &'static str {
    match mission {
        Mission::Operator => "a solar storm",
        Mission::Inmobiliaria { .. } => "illegal land clearing",
        Mission::Ong { .. } => "deforestation",
    }
}

fn apply_scenario_event(state: &mut GameState, severity: f64) {
    let message = match &mut state.mission {
        Mission::Operator => {
            let mut hit = 0;
            for sat in state.satellites.iter_mut().filter(|s| s.is_active()) {
                sat.add_risk(severity);
                hit += 1;
            }
            format!("Solar storm: atmospheric drag raised risk on {hit} satellites")
        }
        Mission::Inmobiliaria { aoi } => {
            let loss = Decimal::from_f64(severity).unwrap_or_default();
            aoi.property_value = (aoi.property_value * (Decimal::ONE - loss)).round_dp(2);
            format!(
                "Illegal land clearing near the property: value down to ${}",
                aoi.property_value
            )
        }
        Mission::Ong { aoi } => {
            aoi.carbon_credits = (aoi.carbon_credits - severity).max(0.0);
            aoi.forest_cover_pct = (aoi.forest_cover_pct - FOREST_COVER_LOSS_PCT).max(0.0);
            format!(
                "Deforestation detected: carbon credits down to {:.0}, forest cover {:.0}%",
                aoi.carbon_credits, aoi.forest_cover_pct
            )
        }
    };
    warn!(game_id = %state.id, turn = state.turn, event = %message, "scenario event");
    state.log(message);
}
