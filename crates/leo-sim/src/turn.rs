//! Turn resolution: player orders, natural decay, random events, bookkeeping.
//!
//! Draw order is fixed so a seeded source replays a game exactly: one draw per
//! satellite that holds position (list order), one collision draw per active
//! satellite (list order), then one draw for the scenario event.

use leo_core::{EngineError, GameState, RandomSource, SatAction, TurnActions};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info, warn};

use crate::events::{self, ScenarioRoll};
use crate::Engine;

/// What happened during one resolution, for the turn summary.
#[derive(Debug, Default)]
struct Tally {
    actions: u32,
    events: u32,
}

/// Orders the budget covers this turn, indexed like the satellite list.
#[derive(Debug)]
struct Settlement {
    orders: Vec<SatAction>,
    charges: Vec<Decimal>,
    /// Refusal to record for a satellite whose order was dropped.
    notes: Vec<Option<String>>,
}

/// Split `total` into `n` shares rounded down to cents; the last share takes
/// the remainder so the shares add up to `total` exactly.
fn split_cost(total: Decimal, n: usize) -> Vec<Decimal> {
    if n == 0 {
        return Vec::new();
    }
    let share = (total / Decimal::from(n)).round_dp_with_strategy(2, RoundingStrategy::ToZero);
    let mut shares = vec![share; n];
    shares[n - 1] = total - share * Decimal::from(n - 1);
    shares
}

impl Engine {
    /// Resolve one turn and return the next state.
    ///
    /// `state` is left untouched. Fails with
    /// [`EngineError::GameAlreadyComplete`] once every turn has been played.
    /// Orders the budget cannot cover are refused one by one and logged; the
    /// rest of the turn still resolves.
    pub fn resolve_turn<R: RandomSource + ?Sized>(
        &self,
        state: &GameState,
        actions: &TurnActions,
        rng: &mut R,
    ) -> Result<GameState, EngineError> {
        if state.is_complete() {
            return Err(EngineError::GameAlreadyComplete {
                turn: state.turn,
                max_turns: state.max_turns,
            });
        }
        let mut next = state.clone();
        let mut tally = Tally::default();

        for id in actions.sat_actions.keys() {
            if next.satellite(id).is_none() {
                debug!(game_id = %next.id, sat_id = %id, "order for unknown satellite ignored");
            }
        }

        let settlement = self.settle_orders(&next, actions);
        for idx in 0..next.satellites.len() {
            if !next.satellites[idx].is_active() {
                continue;
            }
            if let Some(note) = &settlement.notes[idx] {
                warn!(game_id = %next.id, sat_id = %next.satellites[idx].id, "{note}");
                next.log(note.clone());
            }
            let charge = settlement.charges[idx];
            let executed = match settlement.orders[idx] {
                SatAction::None => false,
                SatAction::Eol => {
                    self.apply_eol(&mut next, idx, charge);
                    true
                }
                SatAction::Group => {
                    self.apply_group(&mut next, idx, charge);
                    true
                }
            };
            if executed {
                tally.actions += 1;
            } else {
                let growth = self.config.idle_risk_growth.sample(rng);
                next.satellites[idx].add_risk(growth);
            }
            let sat = &mut next.satellites[idx];
            if sat.is_active() {
                sat.burn_fuel(self.config.fuel_decay_per_turn);
                sat.age_turns += 1;
            }
        }

        let monitoring = actions.global.monitoring && self.buy_monitoring(&mut next);

        tally.events += events::roll_collisions(&self.config, &mut next, rng);
        match events::roll_scenario_event(&self.config, &mut next, monitoring, rng) {
            ScenarioRoll::Fired => tally.events += 1,
            ScenarioRoll::Prevented | ScenarioRoll::Quiet => {}
        }

        next.log(format!(
            "Turn {} resolved: {} actions, {} events",
            next.turn, tally.actions, tally.events
        ));
        info!(
            game_id = %next.id,
            turn = next.turn,
            actions = tally.actions,
            events = tally.events,
            budget = %next.budget,
            score = next.score,
            "turn resolved"
        );
        next.turn += 1;
        Ok(next)
    }

    /// Decide which orders the budget covers, in list order.
    ///
    /// The group maneuver flies only when every crew member can pay its share.
    /// Members that cannot pay leave the crew and the remaining crew is
    /// settled again with larger shares; below the minimum crew size the
    /// maneuver is cancelled and nobody is charged for it.
    fn settle_orders(&self, state: &GameState, actions: &TurnActions) -> Settlement {
        let min_crew = self.config.group.min_participants;
        let requested: Vec<usize> = state
            .satellites
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_active() && actions.action_for(&s.id) == SatAction::Group)
            .map(|(idx, _)| idx)
            .collect();

        let mut group_notes: Vec<Option<String>> = vec![None; state.satellites.len()];
        let mut crew = if requested.len() >= min_crew {
            requested.clone()
        } else {
            Vec::new()
        };
        let mut settlement = loop {
            let attempt = self.charge_orders(state, actions, &crew);
            let paid: Vec<usize> = crew
                .iter()
                .copied()
                .filter(|&idx| attempt.orders[idx] == SatAction::Group)
                .collect();
            if paid.len() == crew.len() {
                break attempt;
            }
            for &idx in &crew {
                if group_notes[idx].is_none() {
                    group_notes[idx] = attempt.notes[idx].clone();
                }
            }
            crew = if paid.len() >= min_crew { paid } else { Vec::new() };
        };

        for idx in requested {
            if settlement.orders[idx] == SatAction::Group {
                continue;
            }
            let id = &state.satellites[idx].id;
            settlement.notes[idx] = group_notes[idx].take().or_else(|| {
                Some(format!(
                    "Group maneuver needs at least {min_crew} paying satellites; {id} held position"
                ))
            });
        }
        settlement
    }

    /// Charge every order against a running budget in list order, with
    /// `crew` as the group maneuver's participants.
    fn charge_orders(
        &self,
        state: &GameState,
        actions: &TurnActions,
        crew: &[usize],
    ) -> Settlement {
        let n = state.satellites.len();
        let mut settlement = Settlement {
            orders: vec![SatAction::None; n],
            charges: vec![Decimal::ZERO; n],
            notes: vec![None; n],
        };
        let shares = split_cost(self.config.group.total_cost, crew.len());
        let mut budget = state.budget;
        for (idx, sat) in state.satellites.iter().enumerate() {
            if !sat.is_active() {
                continue;
            }
            let id = &sat.id;
            let (cost, label) = match actions.action_for(id) {
                SatAction::None => continue,
                SatAction::Eol => (self.eol_cost(sat), "EOL"),
                SatAction::Group => match crew.iter().position(|&c| c == idx) {
                    Some(pos) => (shares[pos], "group maneuver"),
                    None => continue,
                },
            };
            if budget < cost {
                settlement.notes[idx] = Some(format!(
                    "Insufficient budget for {label} on {id}: needs ${cost}, have ${budget}"
                ));
                continue;
            }
            budget -= cost;
            settlement.orders[idx] = actions.action_for(id);
            settlement.charges[idx] = cost;
        }
        settlement
    }

    fn apply_eol(&self, state: &mut GameState, idx: usize, cost: Decimal) {
        let eol = &self.config.eol;
        let id = state.satellites[idx].id.clone();
        state.budget -= cost;
        state.satellites[idx].retire(eol.residual_risk);
        state.score += eol.score_bonus;
        state.total_delta_v += eol.delta_v;
        debug!(game_id = %state.id, sat_id = %id, %cost, "EOL executed");
        state.log(format!("EOL executed on {id} (${cost})"));
    }

    fn apply_group(&self, state: &mut GameState, idx: usize, share: Decimal) {
        let group = &self.config.group;
        let id = state.satellites[idx].id.clone();
        state.budget -= share;
        let sat = &mut state.satellites[idx];
        sat.risk = (sat.risk * group.risk_factor).max(group.risk_floor).min(1.0);
        sat.burn_fuel(group.fuel_burn);
        state.score += group.score_bonus;
        state.total_delta_v += group.delta_v;
        debug!(game_id = %state.id, sat_id = %id, %share, "group maneuver executed");
        state.log(format!("Group maneuver executed by {id} (${share})"));
    }

    /// Pay for monitoring if affordable; returns whether it is active this turn.
    fn buy_monitoring(&self, state: &mut GameState) -> bool {
        let cost = self.config.monitoring.cost;
        if state.budget < cost {
            warn!(game_id = %state.id, %cost, budget = %state.budget, "monitoring refused");
            state.log(format!(
                "Insufficient budget for monitoring: needs ${cost}, have ${}",
                state.budget
            ));
            return false;
        }
        state.budget -= cost;
        state.log(format!("Monitoring purchased (${cost})"));
        true
    }
}
