//! Tunable engine parameters.
//!
//! [`EngineConfig::default`] carries the reference balance of the game. A
//! YAML file may override any subset of it; missing keys keep their defaults.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{EngineError, RandomSource, Scenario};

/// Closed interval used for uniform draws.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Lower bound.
    pub min: f64,
    /// Upper bound, >= `min`.
    pub max: f64,
}

impl Band {
    /// Construct a band.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Draw a value uniformly inside the band.
    pub fn sample<R: RandomSource + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.uniform(self.min, self.max)
    }

    fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// End-of-life retirement parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EolConfig {
    /// Fixed part of the cost in USD.
    pub base_cost: Decimal,
    /// Extra USD per remaining fuel percent.
    pub surcharge_per_fuel_pct: Decimal,
    /// Residual risk once retired.
    pub residual_risk: f64,
    /// Score awarded per retirement.
    pub score_bonus: f64,
    /// Delta-v consumed by the deorbit burn, m/s.
    pub delta_v: f64,
}

impl Default for EolConfig {
    fn default() -> Self {
        Self {
            base_cost: Decimal::new(1050, 0),
            surcharge_per_fuel_pct: Decimal::new(5, 0),
            residual_risk: 0.02,
            score_bonus: 10.0,
            delta_v: 100.0,
        }
    }
}

/// Shared group-maneuver parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Campaign cost in USD, split evenly between participants.
    pub total_cost: Decimal,
    /// Minimum participants for the maneuver to happen.
    pub min_participants: usize,
    /// Multiplier applied to each participant's risk.
    pub risk_factor: f64,
    /// Risk never drops below this through a group maneuver.
    pub risk_floor: f64,
    /// Fuel percent burned per participant.
    pub fuel_burn: f64,
    /// Score per participant.
    pub score_bonus: f64,
    /// Delta-v per participant, m/s.
    pub delta_v: f64,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            total_cost: Decimal::new(1500, 0),
            min_participants: 2,
            risk_factor: 0.5,
            risk_floor: 0.02,
            fuel_burn: 2.0,
            score_bonus: 3.0,
            delta_v: 15.0,
        }
    }
}

/// Ground monitoring parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Flat cost per turn in USD.
    pub cost: Decimal,
    /// Multiplier applied to the scenario event probability while active.
    pub probability_factor: f64,
    /// Score when monitoring prevented the scenario event.
    pub score_bonus: f64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            cost: Decimal::new(2000, 0),
            probability_factor: 0.4,
            score_bonus: 5.0,
        }
    }
}

/// Consequences of a collision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Damages in USD.
    pub damage_cost: Decimal,
    /// Score removed per collision.
    pub score_penalty: f64,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            damage_cost: Decimal::new(22_000, 0),
            score_penalty: 30.0,
        }
    }
}

/// Scenario-specific negative event rolled once per turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventProfile {
    /// Probability per turn without monitoring.
    pub probability: f64,
    /// Scenario-dependent magnitude: risk added (operator), fraction of
    /// property value lost (inmobiliaria), credits lost (ong).
    pub severity: f64,
}

/// Starting conditions and pacing of one scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioProfile {
    /// Number of playable turns.
    pub max_turns: u32,
    /// Budget suggested to callers that do not pick one.
    pub default_budget: Decimal,
    /// Initial per-satellite risk.
    pub initial_risk: Band,
    /// Initial fuel percent.
    pub initial_fuel: Band,
    /// Orbit altitude in km.
    pub altitude_km: Band,
    /// Recurring negative event.
    pub event: EventProfile,
}

/// Per-scenario profiles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioTable {
    pub operator: ScenarioProfile,
    pub inmobiliaria: ScenarioProfile,
    pub ong: ScenarioProfile,
}

impl Default for ScenarioTable {
    fn default() -> Self {
        Self {
            operator: ScenarioProfile {
                max_turns: 12,
                default_budget: Decimal::new(50_000, 0),
                initial_risk: Band::new(0.05, 0.15),
                initial_fuel: Band::new(70.0, 100.0),
                altitude_km: Band::new(500.0, 600.0),
                event: EventProfile {
                    probability: 0.10,
                    severity: 0.03,
                },
            },
            inmobiliaria: ScenarioProfile {
                max_turns: 6,
                default_budget: Decimal::new(30_000, 0),
                initial_risk: Band::new(0.02, 0.08),
                initial_fuel: Band::new(80.0, 100.0),
                altitude_km: Band::new(600.0, 700.0),
                event: EventProfile {
                    probability: 0.25,
                    severity: 0.08,
                },
            },
            ong: ScenarioProfile {
                max_turns: 6,
                default_budget: Decimal::new(30_000, 0),
                initial_risk: Band::new(0.02, 0.08),
                initial_fuel: Band::new(80.0, 100.0),
                altitude_km: Band::new(600.0, 700.0),
                event: EventProfile {
                    probability: 0.30,
                    severity: 150.0,
                },
            },
        }
    }
}

impl ScenarioTable {
    /// Profile for `scenario`.
    pub fn get(&self, scenario: Scenario) -> &ScenarioProfile {
        match scenario {
            Scenario::Operator => &self.operator,
            Scenario::Inmobiliaria => &self.inmobiliaria,
            Scenario::Ong => &self.ong,
        }
    }
}

/// All engine parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Budget needed per satellite; caps the constellation size.
    pub budget_per_satellite: Decimal,
    /// Hard ceiling on the constellation size, whatever the budget.
    pub max_constellation: u32,
    /// Risk added each turn to a satellite that holds position.
    pub idle_risk_growth: Band,
    /// Fuel percent lost each turn by active satellites.
    pub fuel_decay_per_turn: f64,
    pub eol: EolConfig,
    pub group: GroupConfig,
    pub monitoring: MonitoringConfig,
    pub collision: CollisionConfig,
    pub scenarios: ScenarioTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            budget_per_satellite: Decimal::new(10_000, 0),
            max_constellation: 100,
            idle_risk_growth: Band::new(0.02, 0.05),
            fuel_decay_per_turn: 0.5,
            eol: EolConfig::default(),
            group: GroupConfig::default(),
            monitoring: MonitoringConfig::default(),
            collision: CollisionConfig::default(),
            scenarios: ScenarioTable::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, EngineError> {
        let cfg: EngineConfig =
            serde_yaml::from_str(text).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Profile for `scenario`.
    pub fn scenario(&self, scenario: Scenario) -> &ScenarioProfile {
        self.scenarios.get(scenario)
    }

    /// Check ranges and orderings of every parameter.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |what: &str| Err(EngineError::InvalidConfig(what.to_string()));
        if self.budget_per_satellite <= Decimal::ZERO {
            return invalid("budget_per_satellite must be > 0");
        }
        if self.max_constellation == 0 {
            return invalid("max_constellation must be > 0");
        }
        if !self.idle_risk_growth.is_valid() || self.idle_risk_growth.min < 0.0 {
            return invalid("idle_risk_growth must be an ordered, non-negative band");
        }
        if !(self.fuel_decay_per_turn.is_finite() && self.fuel_decay_per_turn >= 0.0) {
            return invalid("fuel_decay_per_turn must be >= 0");
        }
        let money = [
            self.eol.base_cost,
            self.eol.surcharge_per_fuel_pct,
            self.group.total_cost,
            self.monitoring.cost,
            self.collision.damage_cost,
        ];
        if money.iter().any(|m| *m < Decimal::ZERO) {
            return invalid("costs must be non-negative");
        }
        let unit = [
            self.eol.residual_risk,
            self.group.risk_factor,
            self.group.risk_floor,
            self.monitoring.probability_factor,
        ];
        if unit.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return invalid("risk factors and floors must be within [0,1]");
        }
        if self.group.min_participants < 2 {
            return invalid("group.min_participants must be >= 2");
        }
        if self.eol.delta_v < 0.0 || self.group.delta_v < 0.0 {
            return invalid("delta_v must be >= 0");
        }
        for scenario in Scenario::ALL {
            let p = self.scenario(scenario);
            if p.max_turns == 0 {
                return invalid("max_turns must be > 0");
            }
            if p.default_budget <= Decimal::ZERO {
                return invalid("default_budget must be > 0");
            }
            if !(p.initial_risk.is_valid()
                && p.initial_fuel.is_valid()
                && p.altitude_km.is_valid())
            {
                return invalid("scenario bands must be ordered");
            }
            if p.initial_risk.min < 0.0 || p.initial_risk.max > 1.0 {
                return invalid("initial_risk must be within [0,1]");
            }
            if p.initial_fuel.min < 0.0 || p.initial_fuel.max > 100.0 {
                return invalid("initial_fuel must be within [0,100]");
            }
            if !(0.0..=1.0).contains(&p.event.probability) {
                return invalid("event probability must be within [0,1]");
            }
            if !(p.event.severity.is_finite() && p.event.severity >= 0.0) {
                return invalid("event severity must be >= 0");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = EngineConfig::from_yaml_str(
            "eol:\n  base_cost: 2000\nmonitoring:\n  probability_factor: 0.5\n",
        )
        .unwrap();
        assert_eq!(cfg.eol.base_cost, Decimal::new(2000, 0));
        assert_eq!(cfg.eol.score_bonus, 10.0);
        assert_eq!(cfg.monitoring.probability_factor, 0.5);
        assert_eq!(cfg.scenarios.operator.max_turns, 12);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = EngineConfig::from_yaml_str("group:\n  min_participants: 1\n").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
        let err = EngineConfig::from_yaml_str("idle_risk_growth: {min: 0.5, max: 0.1}\n")
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
        assert!(EngineConfig::from_yaml_str("eol: 5").is_err());
        let err = EngineConfig::from_yaml_str("max_constellation: 0\n").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn bundled_config_matches_defaults() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/config/engine.yaml");
        let text = std::fs::read_to_string(path).unwrap();
        let cfg = EngineConfig::from_yaml_str(&text).unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn scenario_profiles_differ_in_pacing() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.scenario(Scenario::Operator).max_turns, 12);
        assert_eq!(cfg.scenario(Scenario::Inmobiliaria).max_turns, 6);
        assert_eq!(cfg.scenario(Scenario::Ong).max_turns, 6);
    }
}
