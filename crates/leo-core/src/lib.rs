#![deny(warnings)]

//! Core domain models and invariants for LEO Decisions.
//!
//! This crate defines the serializable game snapshot shared by the engine,
//! the report builder and the session registry, together with validation
//! helpers that check the state invariants every resolved turn must keep.

pub mod actions;
pub mod config;
pub mod random;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use actions::{GlobalActions, SatAction, StepRequest, TurnActions};
pub use config::{Band, EngineConfig};
pub use random::{RandomSource, SeededRandom, SequenceRandom};

/// Opaque identifier of one game session.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub String);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a satellite, unique within a session, e.g. "SAT-03".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SatelliteId(pub String);

impl SatelliteId {
    /// Identifier for the satellite at zero-based position `index`.
    pub fn for_index(index: usize) -> Self {
        SatelliteId(format!("SAT-{:02}", index + 1))
    }
}

impl fmt::Display for SatelliteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Player role chosen at the start of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// Satellite operator running a commercial constellation.
    Operator,
    /// Real-estate developer watching a property from orbit.
    Inmobiliaria,
    /// Environmental NGO monitoring a protected forest.
    Ong,
}

impl Scenario {
    /// Every recognized scenario.
    pub const ALL: [Scenario; 3] = [Scenario::Operator, Scenario::Inmobiliaria, Scenario::Ong];

    /// Wire key of the scenario.
    pub fn key(self) -> &'static str {
        match self {
            Scenario::Operator => "operator",
            Scenario::Inmobiliaria => "inmobiliaria",
            Scenario::Ong => "ong",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Scenario {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "operator" => Ok(Scenario::Operator),
            "inmobiliaria" | "real-estate" | "realestate" => Ok(Scenario::Inmobiliaria),
            "ong" | "ngo" => Ok(Scenario::Ong),
            _ => Err(EngineError::InvalidScenario(s.to_string())),
        }
    }
}

/// Area of interest tracked by the real-estate scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealEstateAoi {
    /// Appraised value of the watched property in USD.
    pub property_value: Decimal,
    /// Size of the watched plot.
    pub hectares: f64,
}

/// Area of interest tracked by the NGO scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConservationAoi {
    /// Carbon credits (tCO2e) the protected forest still certifies.
    pub carbon_credits: f64,
    /// Remaining forest cover in percent.
    pub forest_cover_pct: f64,
}

/// Scenario together with the state only that scenario carries.
///
/// Serialized flattened into [`GameState`] as `"scenario"` plus an optional
/// `"aoi"` object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scenario", rename_all = "lowercase")]
pub enum Mission {
    /// Operators manage the constellation itself; no AOI.
    Operator,
    /// Real-estate mission with a watched property.
    Inmobiliaria { aoi: RealEstateAoi },
    /// NGO mission with a watched forest.
    Ong { aoi: ConservationAoi },
}

impl Mission {
    /// Scenario this mission belongs to.
    pub fn scenario(&self) -> Scenario {
        match self {
            Mission::Operator => Scenario::Operator,
            Mission::Inmobiliaria { .. } => Scenario::Inmobiliaria,
            Mission::Ong { .. } => Scenario::Ong,
        }
    }
}

/// Lifecycle of a satellite. Satellites are flagged, never removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SatelliteStatus {
    /// In service; accrues risk and takes part in collision checks.
    #[default]
    Active,
    /// End-of-life executed; inert.
    Retired,
    /// Lost to a collision; risk locked at 1.0.
    Destroyed,
}

/// One satellite of the constellation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Satellite {
    /// Stable identifier.
    pub id: SatelliteId,
    /// Per-turn collision probability in [0,1].
    pub risk: f64,
    /// Remaining propellant in percent, [0,100].
    pub fuel: f64,
    /// True once an end-of-life retirement was executed.
    pub eol_planned: bool,
    /// Lifecycle status.
    pub status: SatelliteStatus,
    /// Orbit altitude in km.
    pub altitude_km: f64,
    /// Turns spent in service.
    pub age_turns: u32,
}

impl Satellite {
    /// Whether the satellite still accrues risk and can act.
    pub fn is_active(&self) -> bool {
        self.status == SatelliteStatus::Active
    }

    /// Add `delta` to the risk, clamped into [0,1].
    pub fn add_risk(&mut self, delta: f64) {
        self.risk = clamp_unit(self.risk + delta);
    }

    /// Burn `amount` percent of fuel, never going below empty.
    pub fn burn_fuel(&mut self, amount: f64) {
        self.fuel = (self.fuel - amount).max(0.0);
    }

    /// Flag the satellite as retired with its residual risk.
    pub fn retire(&mut self, residual_risk: f64) {
        self.status = SatelliteStatus::Retired;
        self.eol_planned = true;
        self.risk = clamp_unit(residual_risk);
        self.fuel = 0.0;
    }

    /// Flag the satellite as destroyed.
    pub fn destroy(&mut self) {
        self.status = SatelliteStatus::Destroyed;
        self.risk = 1.0;
    }
}

/// One line of the narrative audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Turn during which the event happened.
    pub turn: u32,
    /// Human-readable description.
    pub event: String,
}

/// Serializable snapshot of one running game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Session identifier.
    pub id: GameId,
    /// Scenario and its scenario-specific state.
    #[serde(flatten)]
    pub mission: Mission,
    /// Remaining money in USD; negative means debt.
    pub budget: Decimal,
    /// Current turn, starting at 1.
    pub turn: u32,
    /// Last playable turn.
    pub max_turns: u32,
    /// Accumulated ESG score.
    pub score: f64,
    /// Collisions suffered so far.
    pub collisions: u32,
    /// Propulsive effort consumed so far, m/s.
    pub total_delta_v: f64,
    /// Constellation, in creation order.
    pub satellites: Vec<Satellite>,
    /// Append-only event log.
    pub history: Vec<HistoryEntry>,
}

impl GameState {
    /// Scenario of the game.
    pub fn scenario(&self) -> Scenario {
        self.mission.scenario()
    }

    /// True once every turn has been played.
    pub fn is_complete(&self) -> bool {
        self.turn > self.max_turns
    }

    /// Turns still to be resolved.
    pub fn turns_remaining(&self) -> u32 {
        (self.max_turns + 1).saturating_sub(self.turn)
    }

    /// Look up a satellite by id.
    pub fn satellite(&self, id: &SatelliteId) -> Option<&Satellite> {
        self.satellites.iter().find(|s| &s.id == id)
    }

    /// Number of satellites with the given status.
    pub fn count_status(&self, status: SatelliteStatus) -> usize {
        self.satellites.iter().filter(|s| s.status == status).count()
    }

    /// Append an event for the current turn.
    pub fn log(&mut self, event: impl Into<String>) {
        self.history.push(HistoryEntry {
            turn: self.turn,
            event: event.into(),
        });
    }
}

/// Errors surfaced by the engine to its caller.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// Scenario key is not one of operator, inmobiliaria, ong.
    #[error("unknown scenario: {0:?}")]
    InvalidScenario(String),
    /// Starting budget must be strictly positive.
    #[error("starting budget must be > 0, got {0}")]
    InvalidBudget(Decimal),
    /// The game already played its last turn.
    #[error("game already complete (turn {turn} > max turns {max_turns})")]
    GameAlreadyComplete { turn: u32, max_turns: u32 },
    /// The actions payload is structurally invalid.
    #[error("malformed actions payload: {0}")]
    MalformedActions(String),
    /// Engine configuration failed to parse or validate.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// Validation errors for state invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Turn counter outside [1, max_turns + 1].
    #[error("turn {turn} outside [1, {max_turns} + 1]")]
    TurnOutOfRange { turn: u32, max_turns: u32 },
    /// Numeric field must be finite.
    #[error("non-finite numeric value encountered")]
    NonFinite,
    /// Satellite risk must be within [0, 1].
    #[error("risk of {0} outside [0,1]")]
    RiskOutOfRange(String),
    /// Satellite fuel must be within [0, 100].
    #[error("fuel of {0} outside [0,100]")]
    FuelOutOfRange(String),
    /// Satellite ids must be unique.
    #[error("duplicate satellite id: {0}")]
    DuplicateSatellite(String),
    /// `eol_planned` must agree with the retired status.
    #[error("eol flag and status disagree for {0}")]
    StatusMismatch(String),
    /// Accumulators must be non-negative.
    #[error("negative accumulator: {0}")]
    NegativeAccumulator(&'static str),
}

/// Validate a single satellite.
pub fn validate_satellite(s: &Satellite) -> Result<(), ValidationError> {
    if !(s.risk.is_finite() && s.fuel.is_finite() && s.altitude_km.is_finite()) {
        return Err(ValidationError::NonFinite);
    }
    if !(0.0..=1.0).contains(&s.risk) {
        return Err(ValidationError::RiskOutOfRange(s.id.0.clone()));
    }
    if !(0.0..=100.0).contains(&s.fuel) {
        return Err(ValidationError::FuelOutOfRange(s.id.0.clone()));
    }
    if s.eol_planned != (s.status == SatelliteStatus::Retired) {
        return Err(ValidationError::StatusMismatch(s.id.0.clone()));
    }
    if s.status == SatelliteStatus::Destroyed && s.risk < 1.0 {
        return Err(ValidationError::RiskOutOfRange(s.id.0.clone()));
    }
    Ok(())
}

/// Validate a full game snapshot.
pub fn validate_state(state: &GameState) -> Result<(), ValidationError> {
    if state.turn == 0 || state.turn > state.max_turns + 1 {
        return Err(ValidationError::TurnOutOfRange {
            turn: state.turn,
            max_turns: state.max_turns,
        });
    }
    if !(state.score.is_finite() && state.total_delta_v.is_finite()) {
        return Err(ValidationError::NonFinite);
    }
    if state.total_delta_v < 0.0 {
        return Err(ValidationError::NegativeAccumulator("totalDeltaV"));
    }
    let mut ids: BTreeSet<&SatelliteId> = BTreeSet::new();
    for s in &state.satellites {
        validate_satellite(s)?;
        if !ids.insert(&s.id) {
            return Err(ValidationError::DuplicateSatellite(s.id.0.clone()));
        }
    }
    if let Mission::Ong { aoi } = &state.mission {
        if !(aoi.carbon_credits.is_finite() && aoi.forest_cover_pct.is_finite()) {
            return Err(ValidationError::NonFinite);
        }
    }
    Ok(())
}

/// Clamp a probability-like value into [0,1].
pub fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sat(i: usize) -> Satellite {
        Satellite {
            id: SatelliteId::for_index(i),
            risk: 0.1,
            fuel: 80.0,
            eol_planned: false,
            status: SatelliteStatus::Active,
            altitude_km: 550.0,
            age_turns: 0,
        }
    }

    fn state(mission: Mission) -> GameState {
        GameState {
            id: GameId("leo-test".to_string()),
            mission,
            budget: Decimal::new(50_000, 0),
            turn: 1,
            max_turns: 12,
            score: 0.0,
            collisions: 0,
            total_delta_v: 0.0,
            satellites: vec![sat(0), sat(1)],
            history: vec![],
        }
    }

    #[test]
    fn scenario_keys_parse() {
        for s in Scenario::ALL {
            assert_eq!(s.key().parse::<Scenario>().unwrap(), s);
        }
        assert_eq!("NGO".parse::<Scenario>().unwrap(), Scenario::Ong);
        assert_eq!(
            " real-estate ".parse::<Scenario>().unwrap(),
            Scenario::Inmobiliaria
        );
        assert_eq!(
            "miner".parse::<Scenario>(),
            Err(EngineError::InvalidScenario("miner".to_string()))
        );
    }

    #[test]
    fn satellite_ids_are_padded() {
        assert_eq!(SatelliteId::for_index(0).0, "SAT-01");
        assert_eq!(SatelliteId::for_index(11).0, "SAT-12");
    }

    #[test]
    fn operator_state_has_no_aoi() {
        let v = serde_json::to_value(state(Mission::Operator)).unwrap();
        assert_eq!(v["scenario"], "operator");
        assert!(v.get("aoi").is_none());
        assert_eq!(v["maxTurns"], 12);
        assert_eq!(v["satellites"][0]["id"], "SAT-01");
        assert_eq!(v["satellites"][0]["eolPlanned"], false);
        assert_eq!(v["satellites"][0]["status"], "active");
        assert!(v["budget"].is_number());
    }

    #[test]
    fn ngo_state_snapshot_roundtrip() {
        let st = state(Mission::Ong {
            aoi: ConservationAoi {
                carbon_credits: 1000.0,
                forest_cover_pct: 85.0,
            },
        });
        let s = serde_json::to_string(&st).unwrap();
        let v: serde_json::Value = serde_json::from_str(&s).unwrap();
        assert_eq!(v["scenario"], "ong");
        assert_eq!(v["aoi"]["carbonCredits"], 1000.0);
        let back: GameState = serde_json::from_str(&s).unwrap();
        assert_eq!(back.scenario(), Scenario::Ong);
        assert_eq!(back.satellites.len(), 2);
        assert_eq!(back.budget, Decimal::new(50_000, 0));
    }

    #[test]
    fn real_estate_aoi_roundtrip() {
        let st = state(Mission::Inmobiliaria {
            aoi: RealEstateAoi {
                property_value: Decimal::new(250_000, 0),
                hectares: 40.0,
            },
        });
        let s = serde_json::to_string(&st).unwrap();
        let back: GameState = serde_json::from_str(&s).unwrap();
        match back.mission {
            Mission::Inmobiliaria { aoi } => {
                assert_eq!(aoi.property_value, Decimal::new(250_000, 0))
            }
            other => panic!("unexpected mission {other:?}"),
        }
    }

    #[test]
    fn retire_and_destroy_flag_without_removal() {
        let mut st = state(Mission::Operator);
        st.satellites[0].retire(0.02);
        st.satellites[1].destroy();
        assert_eq!(st.satellites.len(), 2);
        assert_eq!(st.count_status(SatelliteStatus::Retired), 1);
        assert_eq!(st.count_status(SatelliteStatus::Destroyed), 1);
        assert!(st.satellites[0].eol_planned);
        assert_eq!(st.satellites[1].risk, 1.0);
        validate_state(&st).unwrap();
    }

    #[test]
    fn validation_catches_broken_invariants() {
        let mut st = state(Mission::Operator);
        st.turn = 0;
        assert!(matches!(
            validate_state(&st),
            Err(ValidationError::TurnOutOfRange { .. })
        ));

        let mut st = state(Mission::Operator);
        st.satellites[1].id = st.satellites[0].id.clone();
        assert_eq!(
            validate_state(&st),
            Err(ValidationError::DuplicateSatellite("SAT-01".to_string()))
        );

        let mut st = state(Mission::Operator);
        st.satellites[0].eol_planned = true;
        assert_eq!(
            validate_state(&st),
            Err(ValidationError::StatusMismatch("SAT-01".to_string()))
        );

        let mut st = state(Mission::Operator);
        st.satellites[0].risk = 1.5;
        assert!(validate_state(&st).is_err());
    }

    #[test]
    fn terminal_after_last_turn() {
        let mut st = state(Mission::Operator);
        assert_eq!(st.turns_remaining(), 12);
        st.turn = 13;
        assert!(st.is_complete());
        assert_eq!(st.turns_remaining(), 0);
        validate_state(&st).unwrap();
    }

    #[test]
    fn log_stamps_current_turn() {
        let mut st = state(Mission::Operator);
        st.turn = 4;
        st.log("hello");
        assert_eq!(
            st.history,
            vec![HistoryEntry {
                turn: 4,
                event: "hello".to_string()
            }]
        );
    }

    proptest! {
        #[test]
        fn add_risk_stays_in_unit(start in 0.0f64..=1.0, delta in -5.0f64..5.0) {
            let mut s = sat(0);
            s.risk = start;
            s.add_risk(delta);
            prop_assert!((0.0..=1.0).contains(&s.risk));
        }

        #[test]
        fn burn_fuel_never_negative(start in 0.0f64..=100.0, burn in 0.0f64..500.0) {
            let mut s = sat(0);
            s.fuel = start;
            s.burn_fuel(burn);
            prop_assert!(s.fuel >= 0.0);
            prop_assert!(s.fuel <= start);
        }
    }
}
