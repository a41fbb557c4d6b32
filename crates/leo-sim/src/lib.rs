#![deny(warnings)]

//! Turn-based mission engine for LEO Decisions.
//!
//! [`Engine::start`] builds the initial [`GameState`] of a session and
//! [`Engine::resolve_turn`] advances it by one turn. Both are pure: all
//! randomness comes from the caller's [`RandomSource`] and nothing is
//! persisted. The engine keeps no per-session state, so different sessions
//! can be resolved in parallel; turns of one session must be resolved one at
//! a time by the caller.

mod events;
mod turn;

use leo_core::{
    clamp_unit, ConservationAoi, EngineConfig, EngineError, GameId, GameState, Mission,
    RandomSource, RealEstateAoi, Satellite, SatelliteId, SatelliteStatus, Scenario,
};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Appraised value of the watched property at the start of a real-estate game.
const PROPERTY_VALUE_USD: i64 = 250_000;
/// Size of the watched plot.
const PROPERTY_HECTARES: f64 = 40.0;
/// Credits certified by the protected forest at the start of an NGO game.
const CARBON_CREDITS: f64 = 1_000.0;
/// Initial forest cover of the protected area.
const FOREST_COVER_PCT: f64 = 85.0;

/// Body of a start request: `{"scenario", "budget", "satellitesCount"}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Scenario key, validated by [`Engine::start_request`].
    pub scenario: String,
    /// Starting budget in USD.
    pub budget: Decimal,
    /// Requested constellation size; clamped to what the budget allows.
    #[serde(alias = "satelliteCount")]
    pub satellites_count: u32,
}

/// Mission engine configured with one set of balance parameters.
#[derive(Clone, Debug, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Build an engine after validating `config`.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active balance parameters.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Largest constellation a budget pays for: `floor(budget / per_satellite)`,
    /// at least one and never above `max_constellation`.
    pub fn max_satellites(&self, budget: Decimal) -> u32 {
        (budget / self.config.budget_per_satellite)
            .floor()
            .to_u32()
            .unwrap_or(u32::MAX)
            .min(self.config.max_constellation)
            .max(1)
    }

    /// Cost of retiring `sat`: base cost plus a surcharge per fuel percent left.
    pub fn eol_cost(&self, sat: &Satellite) -> Decimal {
        let fuel = Decimal::from_f64(sat.fuel).unwrap_or_default();
        (self.config.eol.base_cost + self.config.eol.surcharge_per_fuel_pct * fuel).round_dp(2)
    }

    /// Start a new game.
    ///
    /// `satellite_count` is clamped into `[1, max_satellites(budget)]`.
    pub fn start<R: RandomSource + ?Sized>(
        &self,
        scenario: Scenario,
        budget: Decimal,
        satellite_count: u32,
        rng: &mut R,
    ) -> Result<GameState, EngineError> {
        if budget <= Decimal::ZERO {
            return Err(EngineError::InvalidBudget(budget));
        }
        let profile = self.config.scenario(scenario);
        let count = satellite_count.clamp(1, self.max_satellites(budget));
        let id = new_game_id(rng);

        let satellites = (0..count as usize)
            .map(|i| Satellite {
                id: SatelliteId::for_index(i),
                risk: clamp_unit(profile.initial_risk.sample(rng)),
                fuel: profile.initial_fuel.sample(rng).clamp(0.0, 100.0),
                eol_planned: false,
                status: SatelliteStatus::Active,
                altitude_km: profile.altitude_km.sample(rng),
                age_turns: 0,
            })
            .collect();

        let mission = match scenario {
            Scenario::Operator => Mission::Operator,
            Scenario::Inmobiliaria => Mission::Inmobiliaria {
                aoi: RealEstateAoi {
                    property_value: Decimal::new(PROPERTY_VALUE_USD, 0),
                    hectares: PROPERTY_HECTARES,
                },
            },
            Scenario::Ong => Mission::Ong {
                aoi: ConservationAoi {
                    carbon_credits: CARBON_CREDITS,
                    forest_cover_pct: FOREST_COVER_PCT,
                },
            },
        };

        info!(game_id = %id, %scenario, %budget, satellites = count, "game started");
        Ok(GameState {
            id,
            mission,
            budget,
            turn: 1,
            max_turns: profile.max_turns,
            score: 0.0,
            collisions: 0,
            total_delta_v: 0.0,
            satellites,
            history: Vec::new(),
        })
    }

    /// Start a game from a wire request, validating the scenario key.
    pub fn start_request<R: RandomSource + ?Sized>(
        &self,
        req: &StartRequest,
        rng: &mut R,
    ) -> Result<GameState, EngineError> {
        let scenario: Scenario = req.scenario.parse()?;
        self.start(scenario, req.budget, req.satellites_count, rng)
    }
}

fn new_game_id<R: RandomSource + ?Sized>(rng: &mut R) -> GameId {
    let bits = (rng.next_f64() * (1u64 << 48) as f64) as u64;
    GameId(format!("leo-{bits:012x}"))
}
