//! Index of live sessions keyed by join code.
//!
//! The registry is the only owner of session lifetimes. It hands out codes,
//! seats players, forwards commands by code and reclaims finished or idle
//! sessions. Unrelated sessions never contend on a shared lock: the index is
//! a sharded [`DashMap`] and each session carries its own mutex.

mod code;
mod sanitize;
mod sweeper;

pub use code::{normalize, SessionCode, CODE_ALPHABET, CODE_LENGTH};
pub use sanitize::{sanitize_name, FALLBACK_NAME};
pub use sweeper::spawn_sweeper;

use crate::catalog::CharacterId;
use crate::config::GameConfig;
use crate::env::GameEnv;
use crate::session::{JoinResult, PlayerToken, PostRoundDecision, Session};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct SessionRegistry {
    sessions: DashMap<SessionCode, Arc<Session>>,
    config: Arc<GameConfig>,
    env: GameEnv,
}

impl SessionRegistry {
    pub fn new(config: GameConfig, env: GameEnv) -> Self {
        Self {
            sessions: DashMap::new(),
            config: Arc::new(config),
            env,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Open a new session with the caller in slot one.
    ///
    /// Codes are drawn at random until one is free. Claiming a code and
    /// seating the creator happen under the same index entry, so nobody can
    /// join before the creator holds slot one.
    pub fn create_session(&self, token: PlayerToken, name: &str) -> Arc<Session> {
        let name = sanitize_name(name, self.config.max_name_len);
        loop {
            let code = SessionCode::generate(self.env.random.as_ref());
            match self.sessions.entry(code) {
                Entry::Occupied(taken) => {
                    debug!(code = %taken.key(), "session code in use, drawing another");
                }
                Entry::Vacant(slot) => {
                    let session = Session::new(
                        slot.key().clone(),
                        Arc::clone(&self.config),
                        self.env.clone(),
                    );
                    session.add_player(token, name);
                    slot.insert(Arc::clone(&session));
                    info!(code = %session.code(), "session created");
                    return session;
                }
            }
        }
    }

    /// Seat a player in an existing session.
    ///
    /// The session is returned only when the caller ends up seated.
    pub fn join_session(
        &self,
        code: &str,
        token: PlayerToken,
        name: &str,
    ) -> (JoinResult, Option<Arc<Session>>) {
        let Some(session) = self.get_session(code) else {
            debug!(code, "join for unknown session");
            return (JoinResult::NotFound, None);
        };

        let name = sanitize_name(name, self.config.max_name_len);
        let result = session.add_player(token, name);
        debug!(code = %session.code(), ?result, "join handled");
        let session = result.is_seated().then_some(session);
        (result, session)
    }

    /// Case- and whitespace-insensitive lookup.
    pub fn get_session(&self, code: &str) -> Option<Arc<Session>> {
        let code = normalize(code);
        self.sessions
            .get(code.as_str())
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove_session(&self, code: &str) {
        let code = normalize(code);
        if self.sessions.remove(code.as_str()).is_some() {
            info!(code = %code, "session removed");
        }
    }

    /// Drop every finished session and every session idle past the timeout.
    ///
    /// Candidates are collected first and each is re-checked while being
    /// removed, so a session that saw activity in between is kept.
    pub fn remove_stale_sessions(&self) -> usize {
        let now = self.env.clock.now();
        let idle_timeout = self.config.idle_timeout();

        let candidates: Vec<SessionCode> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_stale(now, idle_timeout))
            .map(|entry| entry.key().clone())
            .collect();

        candidates
            .iter()
            .filter(|code| {
                let removed = self
                    .sessions
                    .remove_if(*code, |_, session| session.is_stale(now, idle_timeout));
                if removed.is_some() {
                    debug!(code = %code, "stale session removed");
                }
                removed.is_some()
            })
            .count()
    }

    /// Run [`remove_stale_sessions`](Self::remove_stale_sessions) on the
    /// configured interval.
    pub fn start_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        spawn_sweeper(Arc::clone(self), self.config.sweep_interval())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn select_mystery_people(
        &self,
        code: &str,
        token: &str,
        first: CharacterId,
        second: CharacterId,
    ) -> bool {
        self.get_session(code)
            .is_some_and(|session| session.select_mystery_people(token, first, second))
    }

    pub fn start_next_turn(&self, code: &str, token: &str) -> bool {
        self.get_session(code)
            .is_some_and(|session| session.start_next_turn(token))
    }

    pub fn ask_question(&self, code: &str, token: &str, text: &str) -> bool {
        self.get_session(code)
            .is_some_and(|session| session.ask_question(token, text))
    }

    pub fn answer_question(&self, code: &str, token: &str, answer: &str) -> bool {
        self.get_session(code)
            .is_some_and(|session| session.answer_question(token, answer))
    }

    pub fn eliminate_character(&self, code: &str, token: &str, id: CharacterId) -> bool {
        self.get_session(code)
            .is_some_and(|session| session.eliminate_character(token, id))
    }

    pub fn make_guess(
        &self,
        code: &str,
        token: &str,
        first: CharacterId,
        second: CharacterId,
    ) -> bool {
        self.get_session(code)
            .is_some_and(|session| session.make_guess(token, first, second))
    }

    pub fn make_post_round_decision(
        &self,
        code: &str,
        token: &str,
        decision: PostRoundDecision,
    ) -> bool {
        self.get_session(code)
            .is_some_and(|session| session.make_post_round_decision(token, decision))
    }

    pub fn set_connected(&self, code: &str, token: &str, connected: bool) -> bool {
        self.get_session(code)
            .is_some_and(|session| session.set_connected(token, connected))
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
