#![deny(warnings)]

//! End-of-game report for LEO Decisions.
//!
//! [`summarize`] turns a game snapshot into a performance tier, fleet
//! statistics and a short list of recommendations. It is meant for terminal
//! states but never fails on a game still in progress; `complete` tells the
//! two apart.

use leo_core::{GameId, GameState, Mission, SatelliteStatus, Scenario};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Score needed for [`Tier::Excellent`].
const EXCELLENT_SCORE: f64 = 80.0;
/// Budget that must be exceeded for [`Tier::Excellent`], USD.
const EXCELLENT_BUDGET: i64 = 20_000;
/// Score and collision limit for [`Tier::VeryGood`].
const VERY_GOOD_SCORE: f64 = 60.0;
const VERY_GOOD_COLLISIONS: u32 = 1;
/// Score and collision limit for [`Tier::Acceptable`].
const ACCEPTABLE_SCORE: f64 = 40.0;
const ACCEPTABLE_COLLISIONS: u32 = 2;

/// Below this score the player is nudged towards responsible actions.
const LOW_SCORE: f64 = 40.0;
/// Below this budget the player is warned about spending, USD.
const LOW_BUDGET: i64 = 10_000;
/// Above this delta-v the player is told to coordinate maneuvers, m/s.
const HIGH_DELTA_V: f64 = 500.0;

/// Overall performance band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "Excellent")]
    Excellent,
    #[serde(rename = "Very Good")]
    VeryGood,
    #[serde(rename = "Acceptable")]
    Acceptable,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl Tier {
    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            Tier::Excellent => "Excellent",
            Tier::VeryGood => "Very Good",
            Tier::Acceptable => "Acceptable",
            Tier::NeedsImprovement => "Needs Improvement",
        }
    }
}

/// Classify a result. Cutoffs are exact.
pub fn tier(score: f64, collisions: u32, budget: Decimal) -> Tier {
    if score >= EXCELLENT_SCORE && collisions == 0 && budget > Decimal::new(EXCELLENT_BUDGET, 0) {
        Tier::Excellent
    } else if score >= VERY_GOOD_SCORE && collisions <= VERY_GOOD_COLLISIONS {
        Tier::VeryGood
    } else if score >= ACCEPTABLE_SCORE && collisions <= ACCEPTABLE_COLLISIONS {
        Tier::Acceptable
    } else {
        Tier::NeedsImprovement
    }
}

/// Which rule produced a recommendation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    ReduceCollisions,
    RaiseScore,
    ProtectBudget,
    SaveDeltaV,
    WellDone,
}

/// One piece of advice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub message: String,
}

impl Recommendation {
    fn new(kind: RecommendationKind) -> Self {
        let message = match kind {
            RecommendationKind::ReduceCollisions => {
                "Collisions occurred: schedule end-of-life retirements earlier for high-risk satellites."
            }
            RecommendationKind::RaiseScore => {
                "ESG score is low: favour EOL retirements, group maneuvers and monitoring."
            }
            RecommendationKind::ProtectBudget => {
                "Budget ran low: keep a reserve to absorb collision damages."
            }
            RecommendationKind::SaveDeltaV => {
                "High delta-v consumption: coordinate group maneuvers to save propellant."
            }
            RecommendationKind::WellDone => {
                "Great job: a safe and well-funded mission."
            }
        };
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

/// Advice derived from independent threshold rules; a single default
/// message when none applies.
pub fn recommendations(
    score: f64,
    collisions: u32,
    budget: Decimal,
    total_delta_v: f64,
) -> Vec<Recommendation> {
    let mut out = Vec::new();
    if collisions > 0 {
        out.push(Recommendation::new(RecommendationKind::ReduceCollisions));
    }
    if score < LOW_SCORE {
        out.push(Recommendation::new(RecommendationKind::RaiseScore));
    }
    if budget < Decimal::new(LOW_BUDGET, 0) {
        out.push(Recommendation::new(RecommendationKind::ProtectBudget));
    }
    if total_delta_v > HIGH_DELTA_V {
        out.push(Recommendation::new(RecommendationKind::SaveDeltaV));
    }
    if out.is_empty() {
        out.push(Recommendation::new(RecommendationKind::WellDone));
    }
    out
}

/// Constellation status at report time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    pub active: usize,
    pub retired: usize,
    pub destroyed: usize,
    /// Mean risk of active satellites; `None` when none is left.
    pub mean_active_risk: Option<f64>,
}

/// Scenario-specific key figure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScenarioKpi {
    PropertyValue(Decimal),
    CarbonCredits(f64),
}

/// Summary of one game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub game_id: GameId,
    pub scenario: Scenario,
    /// Whether every turn was played.
    pub complete: bool,
    pub turns_played: u32,
    pub tier: Tier,
    pub score: f64,
    pub collisions: u32,
    pub budget: Decimal,
    pub total_delta_v: f64,
    pub fleet: FleetSummary,
    pub kpi: Option<ScenarioKpi>,
    pub history_entries: usize,
    pub recommendations: Vec<Recommendation>,
}

/// Build the report for `state`. Pure; `state` is not modified.
pub fn summarize(state: &GameState) -> Report {
    let active: Vec<f64> = state
        .satellites
        .iter()
        .filter(|s| s.is_active())
        .map(|s| s.risk)
        .collect();
    let mean_active_risk = if active.is_empty() {
        None
    } else {
        Some(active.iter().sum::<f64>() / active.len() as f64)
    };
    let kpi = match &state.mission {
        Mission::Operator => None,
        Mission::Inmobiliaria { aoi } => Some(ScenarioKpi::PropertyValue(aoi.property_value)),
        Mission::Ong { aoi } => Some(ScenarioKpi::CarbonCredits(aoi.carbon_credits)),
    };
    let tier = tier(state.score, state.collisions, state.budget);
    debug!(game_id = %state.id, tier = tier.label(), "report built");

    Report {
        game_id: state.id.clone(),
        scenario: state.scenario(),
        complete: state.is_complete(),
        turns_played: state.turn.saturating_sub(1),
        tier,
        score: state.score,
        collisions: state.collisions,
        budget: state.budget,
        total_delta_v: state.total_delta_v,
        fleet: FleetSummary {
            active: active.len(),
            retired: state.count_status(SatelliteStatus::Retired),
            destroyed: state.count_status(SatelliteStatus::Destroyed),
            mean_active_risk,
        },
        kpi,
        history_entries: state.history.len(),
        recommendations: recommendations(
            state.score,
            state.collisions,
            state.budget,
            state.total_delta_v,
        ),
    }
}
