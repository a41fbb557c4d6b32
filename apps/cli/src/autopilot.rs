//! Scripted players used to drive a game from the command line.

use std::str::FromStr;

use leo_core::{GameState, SatAction, Scenario, TurnActions};
use leo_sim::Engine;
use rust_decimal::Decimal;

/// Satellites above this risk are candidates for retirement.
const RETIRE_ABOVE: f64 = 0.30;
/// Satellites above this risk join a group maneuver.
const GROUP_ABOVE: f64 = 0.12;
/// Monitoring is bought only while the budget covers this many purchases.
const MONITORING_RESERVE: i64 = 4;

/// How the autopilot plays each turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Never act.
    Idle,
    /// Retire the single riskiest satellite once it crosses the threshold.
    EolRiskiest,
    /// Group maneuver for every risky satellite, monitoring when affordable.
    Group,
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Policy::Idle),
            "eol-riskiest" | "eol" => Ok(Policy::EolRiskiest),
            "group" => Ok(Policy::Group),
            other => Err(format!(
                "unknown policy '{other}' (expected idle, eol-riskiest or group)"
            )),
        }
    }
}

impl Policy {
    /// Decide the orders for the current turn.
    pub fn plan(self, engine: &Engine, state: &GameState) -> TurnActions {
        match self {
            Policy::Idle => TurnActions::idle(),
            Policy::EolRiskiest => plan_eol(engine, state),
            Policy::Group => plan_group(engine, state),
        }
    }
}

fn plan_eol(engine: &Engine, state: &GameState) -> TurnActions {
    let riskiest = state
        .satellites
        .iter()
        .filter(|s| s.is_active() && !s.eol_planned && s.risk > RETIRE_ABOVE)
        .max_by(|a, b| a.risk.total_cmp(&b.risk));
    match riskiest {
        Some(sat) if engine.eol_cost(sat) <= state.budget => {
            TurnActions::idle().with(&sat.id.0, SatAction::Eol)
        }
        _ => TurnActions::idle(),
    }
}

fn plan_group(engine: &Engine, state: &GameState) -> TurnActions {
    let cfg = engine.config();
    let risky: Vec<_> = state
        .satellites
        .iter()
        .filter(|s| s.is_active() && s.risk > GROUP_ABOVE && s.fuel >= cfg.group.fuel_burn)
        .collect();

    let mut actions = TurnActions::idle();
    if risky.len() >= cfg.group.min_participants && cfg.group.total_cost <= state.budget {
        for sat in risky {
            actions = actions.with(&sat.id.0, SatAction::Group);
        }
    }

    let reserve = cfg.monitoring.cost * Decimal::new(MONITORING_RESERVE, 0);
    let watches_aoi = state.scenario() != Scenario::Operator;
    actions.monitoring(watches_aoi && state.budget >= reserve)
}
