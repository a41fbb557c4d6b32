#![deny(warnings)]

//! In-memory session registry for hosting many games at once.
//!
//! Sessions are addressed by [`GameId`] and expire after an idle lifetime
//! chosen by the host. Resolving a turn is split into [`SessionStore::begin_turn`]
//! and [`SessionStore::commit_turn`] so a host can release its lock on the
//! registry while the engine runs; a session accepts at most one turn in
//! flight. Time is always passed in, never read from a clock.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use leo_core::{EngineError, GameId, GameState, RandomSource, TurnActions};
use leo_sim::Engine;
use thiserror::Error;
use tracing::{debug, info};

/// Errors produced by the registry.
#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    /// No live session with this id.
    #[error("unknown session: {0}")]
    UnknownSession(GameId),
    /// A session with this id is already registered.
    #[error("session already exists: {0}")]
    DuplicateSession(GameId),
    /// Another turn of this session is being resolved.
    #[error("a turn is already in flight for session {0}")]
    TurnInFlight(GameId),
    /// Commit without a matching checkout.
    #[error("no turn checked out for session {0}")]
    NotCheckedOut(GameId),
    /// Committed state does not follow the checked-out turn.
    #[error("stale commit for session {id}: {detail}")]
    StaleCommit { id: GameId, detail: String },
    /// The engine refused the turn.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug)]
struct Entry {
    state: GameState,
    last_access: DateTime<Utc>,
    /// Turn handed out by `begin_turn`, if any.
    checked_out: Option<u32>,
}

/// Live games keyed by id.
#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    sessions: BTreeMap<GameId, Entry>,
}

impl SessionStore {
    /// Empty registry whose sessions expire after `ttl` without access.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: BTreeMap::new(),
        }
    }

    /// Idle lifetime of a session.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of registered sessions, expired ones included until evicted.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Register a freshly started game.
    pub fn insert(&mut self, state: GameState, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.expire(&state.id, now);
        if self.sessions.contains_key(&state.id) {
            return Err(SessionError::DuplicateSession(state.id));
        }
        info!(game_id = %state.id, "session registered");
        self.sessions.insert(
            state.id.clone(),
            Entry {
                state,
                last_access: now,
                checked_out: None,
            },
        );
        Ok(())
    }

    /// Current state of a session.
    pub fn get(&mut self, id: &GameId, now: DateTime<Utc>) -> Result<&GameState, SessionError> {
        let entry = self.live_entry(id, now)?;
        entry.last_access = now;
        Ok(&entry.state)
    }

    /// Check out the session for one turn and hand back a copy of its state.
    pub fn begin_turn(
        &mut self,
        id: &GameId,
        now: DateTime<Utc>,
    ) -> Result<GameState, SessionError> {
        let entry = self.live_entry(id, now)?;
        if entry.checked_out.is_some() {
            return Err(SessionError::TurnInFlight(id.clone()));
        }
        entry.checked_out = Some(entry.state.turn);
        entry.last_access = now;
        debug!(game_id = %id, turn = entry.state.turn, "turn checked out");
        Ok(entry.state.clone())
    }

    /// Store the resolved state of a checked-out turn.
    pub fn commit_turn(
        &mut self,
        id: &GameId,
        state: GameState,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let entry = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownSession(id.clone()))?;
        let expected = entry
            .checked_out
            .ok_or_else(|| SessionError::NotCheckedOut(id.clone()))?
            + 1;
        if state.id != *id {
            return Err(SessionError::StaleCommit {
                id: id.clone(),
                detail: format!("state belongs to session {}", state.id),
            });
        }
        if state.turn != expected {
            return Err(SessionError::StaleCommit {
                id: id.clone(),
                detail: format!("expected turn {expected}, got {}", state.turn),
            });
        }
        entry.state = state;
        entry.checked_out = None;
        entry.last_access = now;
        debug!(game_id = %id, turn = expected, "turn committed");
        Ok(())
    }

    /// Release a checkout without changing the state.
    pub fn abort_turn(&mut self, id: &GameId) -> Result<(), SessionError> {
        let entry = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownSession(id.clone()))?;
        if entry.checked_out.take().is_none() {
            return Err(SessionError::NotCheckedOut(id.clone()));
        }
        Ok(())
    }

    /// Check out, resolve with `engine` and commit in one call.
    ///
    /// Engine errors release the checkout and leave the stored state as is.
    pub fn step<R: RandomSource + ?Sized>(
        &mut self,
        engine: &Engine,
        id: &GameId,
        actions: &TurnActions,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<GameState, SessionError> {
        let current = self.begin_turn(id, now)?;
        match engine.resolve_turn(&current, actions, rng) {
            Ok(next) => {
                self.commit_turn(id, next.clone(), now)?;
                Ok(next)
            }
            Err(e) => {
                self.abort_turn(id)?;
                Err(e.into())
            }
        }
    }

    /// Drop a session, returning its last state.
    pub fn remove(&mut self, id: &GameId) -> Option<GameState> {
        self.sessions.remove(id).map(|e| e.state)
    }

    /// Evict every session idle for longer than the ttl. Sessions with a
    /// turn in flight are kept. Returns the number evicted.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        let before = self.sessions.len();
        self.sessions
            .retain(|_, e| e.checked_out.is_some() || now - e.last_access <= ttl);
        let evicted = before - self.sessions.len();
        if evicted > 0 {
            info!(evicted, "expired sessions evicted");
        }
        evicted
    }

    fn expire(&mut self, id: &GameId, now: DateTime<Utc>) {
        let stale = self
            .sessions
            .get(id)
            .is_some_and(|e| e.checked_out.is_none() && now - e.last_access > self.ttl);
        if stale {
            debug!(game_id = %id, "session expired");
            self.sessions.remove(id);
        }
    }

    fn live_entry(&mut self, id: &GameId, now: DateTime<Utc>) -> Result<&mut Entry, SessionError> {
        self.expire(id, now);
        self.sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownSession(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use leo_core::{SatAction, Scenario, SeededRandom, SequenceRandom};
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn new_game(seed: u64) -> GameState {
        let mut rng = SeededRandom::new(seed);
        Engine::default()
            .start(Scenario::Operator, Decimal::new(50_000, 0), 3, &mut rng)
            .unwrap()
    }

    fn store() -> SessionStore {
        SessionStore::new(Duration::seconds(600))
    }

    #[test]
    fn insert_and_get() {
        let mut s = store();
        let game = new_game(1);
        let id = game.id.clone();
        s.insert(game.clone(), t(0)).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(&id, t(10)).unwrap(), &game);
        assert_eq!(
            s.insert(game, t(20)),
            Err(SessionError::DuplicateSession(id))
        );
    }

    #[test]
    fn step_advances_stored_state() {
        let mut s = store();
        let engine = Engine::default();
        let game = new_game(2);
        let id = game.id.clone();
        s.insert(game, t(0)).unwrap();
        let mut calm = SequenceRandom::constant(0.99);
        let actions = TurnActions::idle().with("SAT-01", SatAction::Eol);
        let next = s.step(&engine, &id, &actions, &mut calm, t(5)).unwrap();
        assert_eq!(next.turn, 2);
        assert_eq!(s.get(&id, t(6)).unwrap().turn, 2);
        assert!(s.get(&id, t(6)).unwrap().satellites[0].eol_planned);
    }

    #[test]
    fn one_turn_in_flight_per_session() {
        let mut s = store();
        let engine = Engine::default();
        let a = new_game(3);
        let b = new_game(4);
        let (ida, idb) = (a.id.clone(), b.id.clone());
        s.insert(a, t(0)).unwrap();
        s.insert(b, t(0)).unwrap();

        let checked = s.begin_turn(&ida, t(1)).unwrap();
        assert_eq!(
            s.begin_turn(&ida, t(2)),
            Err(SessionError::TurnInFlight(ida.clone()))
        );
        // other sessions are independent
        let other = s.begin_turn(&idb, t(2)).unwrap();
        s.abort_turn(&idb).unwrap();
        assert_eq!(other.turn, 1);

        let mut rng = SeededRandom::new(9);
        let next = engine
            .resolve_turn(&checked, &TurnActions::idle(), &mut rng)
            .unwrap();
        s.commit_turn(&ida, next, t(3)).unwrap();
        assert_eq!(s.get(&ida, t(4)).unwrap().turn, 2);
        assert!(s.begin_turn(&ida, t(5)).is_ok());
    }

    #[test]
    fn stale_and_unchecked_commits_are_rejected() {
        let mut s = store();
        let game = new_game(5);
        let id = game.id.clone();
        s.insert(game.clone(), t(0)).unwrap();
        assert_eq!(
            s.commit_turn(&id, game.clone(), t(1)),
            Err(SessionError::NotCheckedOut(id.clone()))
        );
        s.begin_turn(&id, t(1)).unwrap();
        assert_eq!(
            s.commit_turn(&id, game.clone(), t(2)),
            Err(SessionError::StaleCommit {
                id: id.clone(),
                detail: "expected turn 2, got 1".to_string(),
            })
        );
        let mut foreign = game;
        foreign.id = GameId("leo-other".to_string());
        foreign.turn = 2;
        assert!(matches!(
            s.commit_turn(&id, foreign, t(2)),
            Err(SessionError::StaleCommit { .. })
        ));
        assert_eq!(s.abort_turn(&id), Ok(()));
        assert_eq!(s.abort_turn(&id), Err(SessionError::NotCheckedOut(id)));
    }

    #[test]
    fn completed_game_error_releases_checkout() {
        let mut s = store();
        let engine = Engine::default();
        let mut game = new_game(6);
        game.turn = game.max_turns + 1;
        let id = game.id.clone();
        s.insert(game, t(0)).unwrap();
        let mut rng = SeededRandom::new(1);
        let err = s
            .step(&engine, &id, &TurnActions::idle(), &mut rng, t(1))
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Engine(EngineError::GameAlreadyComplete { .. })
        ));
        assert!(s.begin_turn(&id, t(2)).is_ok());
    }

    #[test]
    fn idle_sessions_expire() {
        let mut s = store();
        let a = new_game(7);
        let b = new_game(8);
        let (ida, idb) = (a.id.clone(), b.id.clone());
        s.insert(a, t(0)).unwrap();
        s.insert(b, t(0)).unwrap();
        s.get(&idb, t(500)).unwrap();
        assert_eq!(
            s.get(&ida, t(601)),
            Err(SessionError::UnknownSession(ida.clone()))
        );
        assert_eq!(s.len(), 1);
        assert_eq!(s.evict_expired(t(1_000)), 0);
        assert_eq!(s.evict_expired(t(1_101)), 1);
        assert!(s.is_empty());
    }

    #[test]
    fn in_flight_sessions_survive_eviction() {
        let mut s = store();
        let game = new_game(10);
        let id = game.id.clone();
        s.insert(game, t(0)).unwrap();
        s.begin_turn(&id, t(0)).unwrap();
        assert_eq!(s.evict_expired(t(10_000)), 0);
        assert!(s.remove(&id).is_some());
        assert!(s.remove(&id).is_none());
    }

    proptest! {
        #[test]
        fn sessions_never_share_state(seed_a in any::<u64>(), seed_b in any::<u64>()) {
            prop_assume!(seed_a != seed_b);
            let mut s = store();
            let engine = Engine::default();
            let a = new_game(seed_a);
            let b = new_game(seed_b);
            prop_assume!(a.id != b.id);
            let (ida, idb) = (a.id.clone(), b.id.clone());
            let b_before = b.clone();
            s.insert(a, t(0)).unwrap();
            s.insert(b, t(0)).unwrap();
            let mut rng = SeededRandom::new(seed_a);
            s.step(&engine, &ida, &TurnActions::idle(), &mut rng, t(1)).unwrap();
            prop_assert_eq!(s.get(&idb, t(2)).unwrap(), &b_before);
        }
    }
}
