//! The two-player session state machine.
//!
//! A [`Session`] moves through
//! `Lobby → CharacterSelection → Playing → RoundEnd → {CharacterSelection | GameEnd}`
//! in response to player commands. Commands are fail-soft: one whose
//! preconditions do not hold changes nothing, notifies nobody and returns
//! `false`. The reasons are logged at `debug`.
//!
//! All mutable state sits behind a single per-session mutex. Change
//! notifications are published on a [`tokio::sync::watch`] channel after the
//! lock is released, so subscribers can safely read the session back.
//!
//! # Example
//!
//! ```rust
//! use guesswho::config::GameConfig;
//! use guesswho::env::{GameEnv, ManualClock, ManualScheduler, SeededRandom};
//! use guesswho::registry::SessionCode;
//! use guesswho::session::{JoinResult, Phase, PlayerToken, Session};
//! use std::sync::Arc;
//!
//! let env = GameEnv::new(
//!     Arc::new(ManualClock::default()),
//!     Arc::new(SeededRandom::new(1)),
//!     Arc::new(ManualScheduler::new()),
//! );
//! let code = SessionCode::parse("WXYZ").unwrap();
//! let session = Session::new(code, Arc::new(GameConfig::default()), env);
//!
//! assert_eq!(session.add_player(PlayerToken::from("a"), "Alice"), JoinResult::Success);
//! assert_eq!(session.add_player(PlayerToken::from("b"), "Bob"), JoinResult::Success);
//! assert_eq!(session.phase(), Phase::CharacterSelection);
//!
//! assert!(session.select_mystery_people("a", 1, 2));
//! assert!(session.select_mystery_people("b", 3, 4));
//! assert_eq!(session.phase(), Phase::Playing);
//! assert!(session.is_active_player("a"));
//! ```

mod chat;
mod outcome;
mod phase;
mod player;
mod rules;
mod snapshot;

pub use chat::{ChatKind, ChatMessage};
pub use outcome::{JoinResult, PostRoundDecision, RoundEndReason};
pub use phase::{Phase, PhaseHistory, PhaseTransition};
pub use player::{MysteryPair, Player, PlayerToken, Slot};
pub use rules::{Rejection, Rejections};
pub use snapshot::{PlayerView, SessionSnapshot};

use crate::catalog::{self, CharacterId};
use crate::config::GameConfig;
use crate::env::{elapsed_between, GameEnv, RandomSource, TimerHandle};
use crate::registry::SessionCode;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rules::Preconditions;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Mutable state guarded by the session lock.
struct SessionState {
    phase: Phase,
    player1: Option<Player>,
    player2: Option<Player>,
    round_number: u32,
    active_player: Option<PlayerToken>,
    question_asked: bool,
    chat_log: Vec<ChatMessage>,
    end_reason: Option<RoundEndReason>,
    round_winner: Option<PlayerToken>,
    match_over: bool,
    match_winner: Option<PlayerToken>,
    countdown_started_at: Option<DateTime<Utc>>,
    decisions: HashMap<PlayerToken, PostRoundDecision>,
    /// Armed on the first post-round decision of a round.
    decision_timer: Option<TimerHandle>,
    last_activity_at: DateTime<Utc>,
    history: PhaseHistory,
}

impl SessionState {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            phase: Phase::Lobby,
            player1: None,
            player2: None,
            round_number: 0,
            active_player: None,
            question_asked: false,
            chat_log: Vec::new(),
            end_reason: None,
            round_winner: None,
            match_over: false,
            match_winner: None,
            countdown_started_at: None,
            decisions: HashMap::new(),
            decision_timer: None,
            last_activity_at: now,
            history: PhaseHistory::new(),
        }
    }

    fn players(&self) -> impl Iterator<Item = &Player> {
        self.player1.iter().chain(self.player2.iter())
    }

    fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.player1.iter_mut().chain(self.player2.iter_mut())
    }

    fn player(&self, token: &str) -> Option<&Player> {
        self.players().find(|player| player.token.as_str() == token)
    }

    fn player_mut(&mut self, token: &str) -> Option<&mut Player> {
        self.players_mut().find(|player| player.token.as_str() == token)
    }

    /// The other seated player. `None` if `token` is not seated.
    fn opponent(&self, token: &str) -> Option<&Player> {
        self.player(token)?;
        self.players().find(|player| player.token.as_str() != token)
    }

    fn slot_of(&self, token: &str) -> Option<Slot> {
        self.player(token).map(|player| player.slot)
    }

    fn is_full(&self) -> bool {
        self.player1.is_some() && self.player2.is_some()
    }

    fn is_active(&self, token: &str) -> bool {
        self.active_player
            .as_ref()
            .is_some_and(|active| active.as_str() == token)
    }

    /// A question is out and the latest non-system entry is that question.
    fn awaiting_answer(&self) -> bool {
        self.question_asked
            && self
                .chat_log
                .iter()
                .rev()
                .find(|message| message.kind != ChatKind::System)
                .is_some_and(|message| message.kind == ChatKind::Question)
    }

    fn countdown_remaining(&self, window: Duration, now: DateTime<Utc>) -> Option<Duration> {
        let started = self.countdown_started_at?;
        window
            .checked_sub(elapsed_between(started, now))
            .filter(|remaining| !remaining.is_zero())
    }

    /// Both players have decided, and decided the same.
    fn consensus(&self) -> Option<PostRoundDecision> {
        let mut decisions = self
            .players()
            .map(|player| self.decisions.get(&player.token).copied());
        let first = decisions.next()??;
        let second = decisions.next()??;
        (first == second).then_some(first)
    }

    fn transition(&mut self, to: Phase, now: DateTime<Utc>) {
        self.history.record(PhaseTransition {
            from: self.phase,
            to,
            round: self.round_number,
            at: now,
        });
        self.phase = to;
    }

    fn begin_play(&mut self, random: &dyn RandomSource, now: DateTime<Utc>) {
        if self.round_number == 0 {
            self.round_number = 1;
        }
        for player in self.players_mut() {
            player.board_order = catalog::shuffled_board(random);
            player.eliminated.clear();
        }
        // Player one opens every round.
        self.active_player = self.player1.as_ref().map(|player| player.token.clone());
        self.question_asked = false;
        self.countdown_started_at = None;
        self.transition(Phase::Playing, now);
    }

    fn start_new_round(&mut self, now: DateTime<Utc>) {
        if self.match_over {
            for player in self.players_mut() {
                player.round_wins = 0;
            }
        }
        self.round_number += 1;
        self.chat_log.clear();
        self.question_asked = false;
        self.countdown_started_at = None;
        self.active_player = None;
        for player in self.players_mut() {
            player.clear_round();
        }
        self.end_reason = None;
        self.round_winner = None;
        self.match_over = false;
        self.match_winner = None;
        self.decisions.clear();
        self.decision_timer = None;
        self.transition(Phase::CharacterSelection, now);
    }

    fn end_game(&mut self, now: DateTime<Utc>) {
        self.decision_timer = None;
        self.transition(Phase::GameEnd, now);
    }
}

/// One game between two players.
///
/// Created by the [`SessionRegistry`](crate::registry::SessionRegistry),
/// which owns its lifetime. Every getter returns an owned copy taken under
/// the lock.
pub struct Session {
    code: SessionCode,
    config: Arc<GameConfig>,
    env: GameEnv,
    state: Mutex<SessionState>,
    changes: watch::Sender<u64>,
    this: Weak<Session>,
}

impl Session {
    pub fn new(code: SessionCode, config: Arc<GameConfig>, env: GameEnv) -> Arc<Self> {
        let now = env.clock.now();
        let (changes, _) = watch::channel(0);
        Arc::new_cyclic(|this| Self {
            code,
            config,
            env,
            state: Mutex::new(SessionState::new(now)),
            changes,
            this: this.clone(),
        })
    }

    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    /// Seat `token` in the first free slot.
    ///
    /// A token that is already seated gets [`JoinResult::AlreadyJoined`] and
    /// nothing changes. Filling the second slot opens character selection.
    pub fn add_player(&self, token: PlayerToken, name: impl Into<String>) -> JoinResult {
        let now = self.env.clock.now();
        let slot = {
            let mut state = self.state.lock();
            if state.player(token.as_str()).is_some() {
                return JoinResult::AlreadyJoined;
            }
            let slot = match (&state.player1, &state.player2) {
                (None, _) => Slot::One,
                (Some(_), None) => Slot::Two,
                (Some(_), Some(_)) => return JoinResult::Full,
            };
            let player = Player::new(token.clone(), name.into(), slot);
            match slot {
                Slot::One => state.player1 = Some(player),
                Slot::Two => state.player2 = Some(player),
            }
            state.last_activity_at = now;
            if state.is_full() && state.phase == Phase::Lobby {
                state.transition(Phase::CharacterSelection, now);
            }
            slot
        };

        info!(code = %self.code, token = %token, slot = slot.number(), "player seated");
        self.notify_changed();
        JoinResult::Success
    }

    /// Lock in this round's secret pair. Play starts once both players have.
    pub fn select_mystery_people(
        &self,
        token: &str,
        first: CharacterId,
        second: CharacterId,
    ) -> bool {
        self.apply("select_mystery_people", token, |state, now| {
            let player = state.player(token).ok_or(Rejection::UnknownPlayer)?;
            Preconditions::new()
                .require_phase(Phase::CharacterSelection, state.phase)
                .require(!player.has_confirmed(), Rejection::AlreadyConfirmed)
                .require(first != second, Rejection::DuplicateIds(first))
                .require(catalog::contains(first), Rejection::UnknownCharacter(first))
                .require(
                    first == second || catalog::contains(second),
                    Rejection::UnknownCharacter(second),
                )
                .check()?;

            let pair = MysteryPair::new(first, second).ok_or(Rejection::DuplicateIds(first))?;
            state.player_mut(token).ok_or(Rejection::UnknownPlayer)?.mystery = Some(pair);

            if state.is_full() && state.players().all(Player::has_confirmed) {
                state.begin_play(self.env.random.as_ref(), now);
                info!(code = %self.code, round = state.round_number, "round started");
            }
            Ok(())
        })
    }

    /// Hand the turn to the other player.
    pub fn start_next_turn(&self, token: &str) -> bool {
        self.apply("start_next_turn", token, |state, _| {
            Preconditions::new()
                .require_turn(state.phase)
                .require(state.is_active(token), Rejection::NotActivePlayer)
                .check()?;

            let next = state
                .opponent(token)
                .map(|player| player.token.clone())
                .ok_or(Rejection::UnknownPlayer)?;
            state.active_player = Some(next);
            state.question_asked = false;
            state.countdown_started_at = None;
            Ok(())
        })
    }

    /// One question per turn, asked by the active player.
    pub fn ask_question(&self, token: &str, text: &str) -> bool {
        let text = text.trim();
        self.apply("ask_question", token, |state, _| {
            Preconditions::new()
                .require_turn(state.phase)
                .require(state.is_active(token), Rejection::NotActivePlayer)
                .require(!state.question_asked, Rejection::QuestionAlreadyAsked)
                .require(!text.is_empty(), Rejection::BlankText)
                .check()?;

            let sender = state
                .player(token)
                .map(|player| player.name.clone())
                .ok_or(Rejection::UnknownPlayer)?;
            state.chat_log.push(ChatMessage::question(sender, text));
            state.question_asked = true;
            Ok(())
        })
    }

    /// Reply to the pending question and start the advisory countdown.
    ///
    /// The answer is free text so that "Both", "One of them" and "Neither"
    /// work as well as yes and no.
    pub fn answer_question(&self, token: &str, answer: &str) -> bool {
        let answer = answer.trim();
        self.apply("answer_question", token, |state, now| {
            let sender = state
                .player(token)
                .map(|player| player.name.clone())
                .ok_or(Rejection::UnknownPlayer)?;
            Preconditions::new()
                .require_turn(state.phase)
                .require(!state.is_active(token), Rejection::IsActivePlayer)
                .require(state.awaiting_answer(), Rejection::NoPendingQuestion)
                .require(!answer.is_empty(), Rejection::BlankText)
                .check()?;

            state.chat_log.push(ChatMessage::answer(sender, answer));
            state.countdown_started_at = Some(now);
            Ok(())
        })
    }

    /// Cross a face off the caller's own board.
    pub fn eliminate_character(&self, token: &str, id: CharacterId) -> bool {
        self.apply("eliminate_character", token, |state, _| {
            let player = state.player(token).ok_or(Rejection::UnknownPlayer)?;
            Preconditions::new()
                .require_turn(state.phase)
                .require(state.is_active(token), Rejection::NotActivePlayer)
                .require(catalog::contains(id), Rejection::UnknownCharacter(id))
                .require(
                    !player.mystery.is_some_and(|pair| pair.contains(id)),
                    Rejection::OwnMysteryPerson(id),
                )
                .require(!player.eliminated.contains(&id), Rejection::AlreadyEliminated(id))
                .check()?;

            state
                .player_mut(token)
                .ok_or(Rejection::UnknownPlayer)?
                .eliminated
                .insert(id);
            Ok(())
        })
    }

    /// Guess the opponent's pair. Either way the round ends.
    ///
    /// Only an exact match wins. Anything else, including one right face out
    /// of two, hands the round to the opponent.
    pub fn make_guess(&self, token: &str, first: CharacterId, second: CharacterId) -> bool {
        self.apply("make_guess", token, |state, now| {
            Preconditions::new()
                .require_turn(state.phase)
                .require(state.is_active(token), Rejection::NotActivePlayer)
                .require(first != second, Rejection::DuplicateIds(first))
                .check()?;

            let guess = MysteryPair::new(first, second).ok_or(Rejection::DuplicateIds(first))?;
            let opponent = state.opponent(token).ok_or(Rejection::UnknownPlayer)?;
            let correct = opponent.mystery == Some(guess);
            let winner = if correct {
                PlayerToken::from(token)
            } else {
                opponent.token.clone()
            };

            let wins = {
                let player = state
                    .player_mut(winner.as_str())
                    .ok_or(Rejection::UnknownPlayer)?;
                player.round_wins += 1;
                player.round_wins
            };
            state.end_reason = Some(if correct {
                RoundEndReason::CorrectGuess
            } else {
                RoundEndReason::WrongGuess
            });
            if wins >= self.config.win_threshold {
                state.match_over = true;
                state.match_winner = Some(winner.clone());
            }
            state.round_winner = Some(winner.clone());
            state.countdown_started_at = None;
            state.transition(Phase::RoundEnd, now);

            info!(
                code = %self.code,
                round = state.round_number,
                winner = %winner,
                correct,
                round_wins = wins,
                "round resolved"
            );
            if state.match_over {
                info!(code = %self.code, winner = %winner, "match over");
            }
            Ok(())
        })
    }

    /// Record what the caller wants next. Acts once both players agree.
    ///
    /// The first decision of a round arms the post-round timeout, which ends
    /// the game if the players have not agreed by the time it fires.
    pub fn make_post_round_decision(&self, token: &str, decision: PostRoundDecision) -> bool {
        self.apply("make_post_round_decision", token, |state, now| {
            Preconditions::new()
                .require_phase(Phase::RoundEnd, state.phase)
                .require(state.player(token).is_some(), Rejection::UnknownPlayer)
                .check()?;

            state.decisions.insert(PlayerToken::from(token), decision);
            if state.decision_timer.is_none() {
                state.decision_timer = Some(self.arm_post_round_timeout(state.round_number));
            }

            match state.consensus() {
                Some(PostRoundDecision::NewRound) => {
                    state.start_new_round(now);
                    info!(code = %self.code, round = state.round_number, "new round agreed");
                }
                Some(PostRoundDecision::EndGame) => {
                    state.end_game(now);
                    info!(code = %self.code, "game ended by agreement");
                }
                None => {}
            }
            Ok(())
        })
    }

    /// Mark a player as connected or disconnected and announce it in chat.
    pub fn set_connected(&self, token: &str, connected: bool) -> bool {
        self.apply("set_connected", token, |state, _| {
            let player = state.player_mut(token).ok_or(Rejection::UnknownPlayer)?;
            if player.connected == connected {
                return Err(Rejection::PresenceUnchanged(connected).into());
            }
            player.connected = connected;
            let status = if connected { "reconnected" } else { "disconnected" };
            let text = format!("{} {status}", player.name);
            state.chat_log.push(ChatMessage::system(text));
            Ok(())
        })
    }

    fn apply<F>(&self, command: &'static str, token: &str, f: F) -> bool
    where
        F: FnOnce(&mut SessionState, DateTime<Utc>) -> Result<(), Rejections>,
    {
        let now = self.env.clock.now();
        let outcome = {
            let mut state = self.state.lock();
            let outcome = f(&mut *state, now);
            if outcome.is_ok() {
                state.last_activity_at = now;
            }
            outcome
        };

        match outcome {
            Ok(()) => {
                debug!(code = %self.code, command, token, "command applied");
                self.notify_changed();
                true
            }
            Err(rejections) => {
                debug!(code = %self.code, command, token, reasons = %rejections, "command ignored");
                false
            }
        }
    }

    fn arm_post_round_timeout(&self, round: u32) -> TimerHandle {
        let session = self.this.clone();
        self.env.scheduler.schedule(
            self.config.post_round_timeout(),
            Box::new(move || {
                if let Some(session) = session.upgrade() {
                    session.expire_post_round(round);
                }
            }),
        )
    }

    /// Timer path. Only acts if the same round is still waiting on decisions.
    fn expire_post_round(&self, round: u32) {
        let now = self.env.clock.now();
        let expired = {
            let mut state = self.state.lock();
            let waiting = state.phase == Phase::RoundEnd && state.round_number == round;
            if waiting {
                state.end_game(now);
                state.last_activity_at = now;
            }
            waiting
        };

        if expired {
            info!(code = %self.code, round, "post-round decision timed out, game ended");
            self.notify_changed();
        }
    }

    fn notify_changed(&self) {
        self.changes
            .send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    /// Receiver that observes a new revision after every accepted change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Current change counter. Bumped once per accepted change.
    pub fn revision(&self) -> u64 {
        *self.changes.borrow()
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    /// Starts at 1 and increments on every new round.
    pub fn round_number(&self) -> u32 {
        self.state.lock().round_number
    }

    /// Copy of the player in slot one.
    pub fn player1(&self) -> Option<Player> {
        self.state.lock().player1.clone()
    }

    pub fn player2(&self) -> Option<Player> {
        self.state.lock().player2.clone()
    }

    /// Copy of the player seated with `token`.
    pub fn player(&self, token: &str) -> Option<Player> {
        self.state.lock().player(token).cloned()
    }

    /// The other seated player, if `token` is seated.
    pub fn opponent(&self, token: &str) -> Option<Player> {
        self.state.lock().opponent(token).cloned()
    }

    /// Both slots are taken.
    pub fn is_full(&self) -> bool {
        self.state.lock().is_full()
    }

    /// `token` holds the turn. Always false for an empty token.
    pub fn is_active_player(&self, token: &str) -> bool {
        !token.is_empty() && self.state.lock().is_active(token)
    }

    pub fn active_player(&self) -> Option<PlayerToken> {
        self.state.lock().active_player.clone()
    }

    /// The active player already asked this turn.
    pub fn question_asked(&self) -> bool {
        self.state.lock().question_asked
    }

    /// The latest question has not been answered yet.
    pub fn awaiting_answer(&self) -> bool {
        self.state.lock().awaiting_answer()
    }

    /// Messages of the current round, oldest first.
    pub fn chat_log(&self) -> Vec<ChatMessage> {
        self.state.lock().chat_log.clone()
    }

    pub fn end_reason(&self) -> Option<RoundEndReason> {
        self.state.lock().end_reason
    }

    /// Winner of the last finished round.
    pub fn round_winner(&self) -> Option<PlayerToken> {
        self.state.lock().round_winner.clone()
    }

    pub fn is_match_over(&self) -> bool {
        self.state.lock().match_over
    }

    /// First player to reach the win threshold.
    pub fn match_winner(&self) -> Option<PlayerToken> {
        self.state.lock().match_winner.clone()
    }

    pub fn countdown_started_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().countdown_started_at
    }

    /// Advisory only. Nothing happens when it runs out.
    pub fn countdown_remaining(&self) -> Option<Duration> {
        let now = self.env.clock.now();
        self.state
            .lock()
            .countdown_remaining(self.config.answer_countdown(), now)
    }

    pub fn countdown_active(&self) -> bool {
        self.countdown_remaining().is_some()
    }

    /// What `token` chose after the round, if anything yet.
    pub fn post_round_decision(&self, token: &str) -> Option<PostRoundDecision> {
        self.state.lock().decisions.get(token).copied()
    }

    /// Time of the last accepted command.
    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.state.lock().last_activity_at
    }

    pub fn phase_history(&self) -> PhaseHistory {
        self.state.lock().history.clone()
    }

    /// Finished, or idle for longer than `idle_timeout`.
    pub fn is_stale(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        let state = self.state.lock();
        state.phase.is_final() || elapsed_between(state.last_activity_at, now) > idle_timeout
    }

    /// What `viewer` is allowed to see right now.
    pub fn snapshot_for(&self, viewer: &str) -> SessionSnapshot {
        let now = self.env.clock.now();
        let revision = self.revision();
        let state = self.state.lock();
        SessionSnapshot::capture(
            &self.code,
            revision,
            &state,
            viewer,
            self.config.answer_countdown(),
            now,
        )
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("code", &self.code)
            .field("revision", &self.revision())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Clock, ManualClock, ManualScheduler, SeededRandom};

    const A: &str = "token-a";
    const B: &str = "token-b";

    struct Fixture {
        session: Arc<Session>,
        clock: Arc<ManualClock>,
        scheduler: Arc<ManualScheduler>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::default());
        let scheduler = Arc::new(ManualScheduler::new());
        let env = GameEnv::new(clock.clone(), Arc::new(SeededRandom::new(42)), scheduler.clone());
        let code = SessionCode::parse("TEST").unwrap();
        let session = Session::new(code, Arc::new(GameConfig::default()), env);
        Fixture {
            session,
            clock,
            scheduler,
        }
    }

    fn seated() -> Fixture {
        let fx = fixture();
        fx.session.add_player(A.into(), "Alice");
        fx.session.add_player(B.into(), "Bob");
        fx
    }

    /// A holds {1, 2}, B holds {3, 4}, A to play.
    fn playing() -> Fixture {
        let fx = seated();
        assert!(fx.session.select_mystery_people(A, 1, 2));
        assert!(fx.session.select_mystery_people(B, 3, 4));
        fx
    }

    fn round_over() -> Fixture {
        let fx = playing();
        assert!(fx.session.make_guess(A, 3, 4));
        fx
    }

    #[test]
    fn first_player_waits_in_lobby() {
        let fx = fixture();
        assert_eq!(fx.session.add_player(A.into(), "Alice"), JoinResult::Success);
        assert_eq!(fx.session.phase(), Phase::Lobby);
        assert_eq!(fx.session.player1().map(|p| p.slot), Some(Slot::One));
        assert!(!fx.session.is_full());
    }

    #[test]
    fn second_player_opens_character_selection() {
        let fx = seated();
        assert!(fx.session.is_full());
        assert_eq!(fx.session.phase(), Phase::CharacterSelection);
        assert_eq!(fx.session.player2().map(|p| p.name), Some("Bob".to_string()));
    }

    #[test]
    fn third_token_is_turned_away() {
        let fx = seated();
        assert_eq!(fx.session.add_player("token-c".into(), "Carol"), JoinResult::Full);
        assert!(fx.session.player("token-c").is_none());
    }

    #[test]
    fn rejoin_keeps_slot_and_phase() {
        let fx = seated();
        let revision = fx.session.revision();

        assert_eq!(fx.session.add_player(A.into(), "Alice again"), JoinResult::AlreadyJoined);
        assert_eq!(
            fx.session.player(A).map(|p| (p.slot, p.name)),
            Some((Slot::One, "Alice".to_string()))
        );
        assert_eq!(fx.session.phase(), Phase::CharacterSelection);
        assert_eq!(fx.session.revision(), revision);
    }

    #[test]
    fn opponent_lookup() {
        let fx = seated();
        assert_eq!(fx.session.opponent(A).map(|p| p.token), Some(B.into()));
        assert_eq!(fx.session.opponent(B).map(|p| p.token), Some(A.into()));
        assert!(fx.session.opponent("nobody").is_none());
    }

    #[test]
    fn both_selections_start_play() {
        let fx = seated();
        assert!(fx.session.select_mystery_people(A, 1, 2));
        assert_eq!(fx.session.phase(), Phase::CharacterSelection);
        assert!(fx.session.select_mystery_people(B, 3, 4));

        assert_eq!(fx.session.phase(), Phase::Playing);
        assert_eq!(fx.session.round_number(), 1);
        assert_eq!(fx.session.active_player(), Some(A.into()));
        for token in [A, B] {
            let mut board = fx.session.player(token).unwrap().board_order;
            board.sort_unstable();
            assert_eq!(board, catalog::ids().collect::<Vec<_>>());
        }
    }

    #[test]
    fn selection_rejects_bad_input() {
        let fx = seated();
        assert!(!fx.session.select_mystery_people(A, 5, 5));
        assert!(!fx.session.select_mystery_people(A, 0, 5));
        assert!(!fx.session.select_mystery_people(A, 5, 25));
        assert!(!fx.session.select_mystery_people("nobody", 1, 2));
        assert!(fx.session.player(A).unwrap().mystery.is_none());
    }

    #[test]
    fn selection_cannot_be_changed_once_confirmed() {
        let fx = seated();
        assert!(fx.session.select_mystery_people(A, 1, 2));
        assert!(!fx.session.select_mystery_people(A, 5, 6));
        assert_eq!(fx.session.player(A).unwrap().mystery_ids(), vec![1, 2]);
    }

    #[test]
    fn selection_outside_character_selection_is_ignored() {
        let fx = fixture();
        fx.session.add_player(A.into(), "Alice");
        assert!(!fx.session.select_mystery_people(A, 1, 2));

        let fx = playing();
        assert!(!fx.session.select_mystery_people(A, 7, 8));
    }

    #[test]
    fn next_turn_swaps_and_resets_turn_state() {
        let fx = playing();
        assert!(fx.session.ask_question(A, "Glasses?"));
        assert!(fx.session.answer_question(B, "No"));
        assert!(fx.session.countdown_active());

        assert!(fx.session.start_next_turn(A));
        assert_eq!(fx.session.active_player(), Some(B.into()));
        assert!(!fx.session.question_asked());
        assert!(!fx.session.countdown_active());
        assert!(fx.session.countdown_started_at().is_none());
    }

    #[test]
    fn only_active_player_ends_turn() {
        let fx = playing();
        assert!(!fx.session.start_next_turn(B));
        assert_eq!(fx.session.active_player(), Some(A.into()));
    }

    #[test]
    fn question_is_trimmed_and_logged() {
        let fx = playing();
        assert!(fx.session.ask_question(A, "  Is it a man?  "));

        let log = fx.session.chat_log();
        assert_eq!(log, vec![ChatMessage::question("Alice", "Is it a man?")]);
        assert!(fx.session.question_asked());
    }

    #[test]
    fn non_active_player_cannot_ask() {
        let fx = playing();
        assert!(!fx.session.ask_question(B, "Hat?"));
        assert!(fx.session.chat_log().is_empty());
        assert!(!fx.session.question_asked());
    }

    #[test]
    fn blank_question_is_ignored() {
        let fx = playing();
        assert!(!fx.session.ask_question(A, "   "));
        assert!(fx.session.chat_log().is_empty());
    }

    #[test]
    fn second_question_in_a_turn_is_ignored() {
        let fx = playing();
        assert!(fx.session.ask_question(A, "Hat?"));
        assert!(!fx.session.ask_question(A, "Beard?"));
        assert_eq!(fx.session.chat_log().len(), 1);
    }

    #[test]
    fn awaiting_answer_follows_question_and_answer() {
        let fx = playing();
        assert!(!fx.session.awaiting_answer());
        fx.session.ask_question(A, "Red hair?");
        assert!(fx.session.awaiting_answer());
        fx.session.answer_question(B, "One of them");
        assert!(!fx.session.awaiting_answer());
    }

    #[test]
    fn answer_requires_pending_question_and_other_player() {
        let fx = playing();
        assert!(!fx.session.answer_question(B, "Yes"));

        fx.session.ask_question(A, "Blue eyes?");
        assert!(!fx.session.answer_question(A, "Yes"));
        assert!(!fx.session.answer_question(B, "  "));
        assert!(fx.session.answer_question(B, " Both "));
        assert!(!fx.session.answer_question(B, "Neither"));

        let log = fx.session.chat_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1], ChatMessage::answer("Bob", "Both"));
    }

    #[test]
    fn system_message_does_not_hide_pending_question() {
        let fx = playing();
        fx.session.ask_question(A, "Big nose?");
        assert!(fx.session.set_connected(A, false));
        assert!(fx.session.awaiting_answer());
        assert!(fx.session.answer_question(B, "Yes"));
    }

    #[test]
    fn countdown_runs_for_configured_window() {
        let fx = playing();
        fx.session.ask_question(A, "Bald?");
        fx.session.answer_question(B, "No");
        assert_eq!(fx.session.countdown_remaining(), Some(Duration::from_secs(10)));

        fx.clock.advance(Duration::from_secs(4));
        assert_eq!(fx.session.countdown_remaining(), Some(Duration::from_secs(6)));

        fx.clock.advance(Duration::from_secs(6));
        assert!(!fx.session.countdown_active());
        assert_eq!(fx.session.phase(), Phase::Playing);
        assert_eq!(fx.session.active_player(), Some(A.into()));
    }

    #[test]
    fn eliminate_adds_to_own_board_only() {
        let fx = playing();
        assert!(fx.session.eliminate_character(A, 10));
        assert!(fx.session.player(A).unwrap().eliminated.contains(&10));
        assert!(fx.session.player(B).unwrap().eliminated.is_empty());
    }

    #[test]
    fn eliminate_rejections() {
        let fx = playing();
        assert!(!fx.session.eliminate_character(A, 1));
        assert!(!fx.session.eliminate_character(A, 2));
        assert!(!fx.session.eliminate_character(B, 10));
        assert!(!fx.session.eliminate_character(A, 30));

        assert!(fx.session.eliminate_character(A, 10));
        let revision = fx.session.revision();
        assert!(!fx.session.eliminate_character(A, 10));
        assert_eq!(fx.session.revision(), revision);
        assert_eq!(fx.session.player(A).unwrap().eliminated.len(), 1);
    }

    #[test]
    fn correct_guess_wins_the_round() {
        let fx = round_over();
        assert_eq!(fx.session.phase(), Phase::RoundEnd);
        assert_eq!(fx.session.end_reason(), Some(RoundEndReason::CorrectGuess));
        assert_eq!(fx.session.round_winner(), Some(A.into()));
        assert_eq!(fx.session.player(A).unwrap().round_wins, 1);
        assert!(!fx.session.is_match_over());
    }

    #[test]
    fn guess_is_order_independent() {
        let fx = playing();
        assert!(fx.session.make_guess(A, 4, 3));
        assert_eq!(fx.session.end_reason(), Some(RoundEndReason::CorrectGuess));
    }

    #[test]
    fn partial_match_loses_the_round() {
        let fx = playing();
        assert!(fx.session.make_guess(A, 3, 5));
        assert_eq!(fx.session.end_reason(), Some(RoundEndReason::WrongGuess));
        assert_eq!(fx.session.round_winner(), Some(B.into()));
        assert_eq!(fx.session.player(B).unwrap().round_wins, 1);
        assert_eq!(fx.session.player(A).unwrap().round_wins, 0);
    }

    #[test]
    fn guess_rejections() {
        let fx = playing();
        assert!(!fx.session.make_guess(B, 1, 2));
        assert!(!fx.session.make_guess(A, 3, 3));
        assert_eq!(fx.session.phase(), Phase::Playing);
    }

    #[test]
    fn guess_cancels_countdown() {
        let fx = playing();
        fx.session.ask_question(A, "Hat?");
        fx.session.answer_question(B, "No");
        fx.session.make_guess(A, 3, 4);
        assert!(fx.session.countdown_started_at().is_none());
    }

    #[test]
    fn fifth_win_ends_the_match() {
        let fx = playing();
        fx.session.state.lock().player1.as_mut().unwrap().round_wins = 4;

        fx.session.make_guess(A, 3, 4);
        assert!(fx.session.is_match_over());
        assert_eq!(fx.session.match_winner(), Some(A.into()));
    }

    #[test]
    fn wins_below_threshold_do_not_end_match() {
        let fx = playing();
        fx.session.state.lock().player1.as_mut().unwrap().round_wins = 2;

        fx.session.make_guess(A, 3, 4);
        assert!(!fx.session.is_match_over());
        assert!(fx.session.match_winner().is_none());
    }

    #[test]
    fn agreeing_on_new_round_resets_round_state() {
        let fx = round_over();
        assert!(fx.session.make_post_round_decision(A, PostRoundDecision::NewRound));
        assert_eq!(fx.session.phase(), Phase::RoundEnd);
        assert!(fx.session.make_post_round_decision(B, PostRoundDecision::NewRound));

        assert_eq!(fx.session.phase(), Phase::CharacterSelection);
        assert_eq!(fx.session.round_number(), 2);
        assert!(fx.session.chat_log().is_empty());
        assert!(fx.session.active_player().is_none());
        assert!(fx.session.round_winner().is_none());
        assert!(fx.session.end_reason().is_none());
        assert!(fx.session.post_round_decision(A).is_none());
        for token in [A, B] {
            let player = fx.session.player(token).unwrap();
            assert!(player.mystery.is_none());
            assert!(player.eliminated.is_empty());
            assert!(player.board_order.is_empty());
        }
        assert_eq!(fx.session.player(A).unwrap().round_wins, 1);
        assert_eq!(fx.scheduler.pending(), 0);
    }

    #[test]
    fn agreeing_on_end_game_finishes() {
        let fx = round_over();
        fx.session.make_post_round_decision(A, PostRoundDecision::EndGame);
        fx.session.make_post_round_decision(B, PostRoundDecision::EndGame);
        assert_eq!(fx.session.phase(), Phase::GameEnd);
        assert_eq!(fx.scheduler.pending(), 0);
    }

    #[test]
    fn disagreement_leaves_round_end() {
        let fx = round_over();
        fx.session.make_post_round_decision(A, PostRoundDecision::NewRound);
        fx.session.make_post_round_decision(B, PostRoundDecision::EndGame);

        assert_eq!(fx.session.phase(), Phase::RoundEnd);
        assert_eq!(fx.session.post_round_decision(A), Some(PostRoundDecision::NewRound));
        assert_eq!(fx.session.post_round_decision(B), Some(PostRoundDecision::EndGame));
    }

    #[test]
    fn changed_decision_can_reach_agreement() {
        let fx = round_over();
        fx.session.make_post_round_decision(A, PostRoundDecision::NewRound);
        fx.session.make_post_round_decision(B, PostRoundDecision::EndGame);
        fx.session.make_post_round_decision(A, PostRoundDecision::EndGame);
        assert_eq!(fx.session.phase(), Phase::GameEnd);
    }

    #[test]
    fn decisions_outside_round_end_are_ignored() {
        let fx = playing();
        assert!(!fx.session.make_post_round_decision(A, PostRoundDecision::EndGame));
        assert_eq!(fx.scheduler.pending(), 0);

        let fx = round_over();
        assert!(!fx.session.make_post_round_decision("nobody", PostRoundDecision::EndGame));
    }

    #[test]
    fn timeout_forces_end_game() {
        let fx = round_over();
        fx.session.make_post_round_decision(A, PostRoundDecision::NewRound);
        assert_eq!(fx.scheduler.pending(), 1);

        fx.scheduler.advance(Duration::from_secs(59));
        assert_eq!(fx.session.phase(), Phase::RoundEnd);
        assert_eq!(fx.scheduler.advance(Duration::from_secs(1)), 1);
        assert_eq!(fx.session.phase(), Phase::GameEnd);
    }

    #[test]
    fn timeout_is_armed_once_per_round() {
        let fx = round_over();
        fx.session.make_post_round_decision(A, PostRoundDecision::NewRound);
        fx.scheduler.advance(Duration::from_secs(30));
        fx.session.make_post_round_decision(B, PostRoundDecision::EndGame);
        assert_eq!(fx.scheduler.pending(), 1);

        fx.scheduler.advance(Duration::from_secs(30));
        assert_eq!(fx.session.phase(), Phase::GameEnd);
    }

    #[test]
    fn consensus_disarms_timeout() {
        let fx = round_over();
        fx.session.make_post_round_decision(A, PostRoundDecision::NewRound);
        fx.session.make_post_round_decision(B, PostRoundDecision::NewRound);

        assert_eq!(fx.scheduler.advance(Duration::from_secs(120)), 0);
        assert_eq!(fx.session.phase(), Phase::CharacterSelection);
    }

    #[test]
    fn expiry_for_an_earlier_round_is_ignored() {
        let fx = round_over();
        fx.session.make_post_round_decision(A, PostRoundDecision::NewRound);
        fx.session.make_post_round_decision(B, PostRoundDecision::NewRound);
        fx.session.select_mystery_people(A, 5, 6);
        fx.session.select_mystery_people(B, 7, 8);
        fx.session.make_guess(A, 7, 8);

        fx.session.expire_post_round(1);
        assert_eq!(fx.session.phase(), Phase::RoundEnd);
        assert_eq!(fx.session.round_number(), 2);
    }

    #[test]
    fn play_again_after_match_resets_scores() {
        let fx = playing();
        fx.session.state.lock().player1.as_mut().unwrap().round_wins = 4;
        fx.session.state.lock().player2.as_mut().unwrap().round_wins = 3;
        fx.session.make_guess(A, 3, 4);
        assert!(fx.session.is_match_over());

        fx.session.make_post_round_decision(A, PostRoundDecision::NewRound);
        fx.session.make_post_round_decision(B, PostRoundDecision::NewRound);

        assert_eq!(fx.session.round_number(), 2);
        assert_eq!(fx.session.player(A).unwrap().round_wins, 0);
        assert_eq!(fx.session.player(B).unwrap().round_wins, 0);
        assert!(!fx.session.is_match_over());
        assert!(fx.session.match_winner().is_none());
    }

    #[test]
    fn next_round_opens_with_player_one() {
        let fx = playing();
        fx.session.start_next_turn(A);
        fx.session.make_guess(B, 1, 2);
        fx.session.make_post_round_decision(A, PostRoundDecision::NewRound);
        fx.session.make_post_round_decision(B, PostRoundDecision::NewRound);
        fx.session.select_mystery_people(B, 9, 10);
        fx.session.select_mystery_people(A, 11, 12);

        assert_eq!(fx.session.active_player(), Some(A.into()));
    }

    #[test]
    fn presence_changes_are_announced() {
        let fx = seated();
        assert!(!fx.session.set_connected(A, true));
        assert!(fx.session.set_connected(A, false));
        assert!(!fx.session.player(A).unwrap().connected);
        assert!(fx.session.set_connected(A, true));

        let texts: Vec<String> = fx.session.chat_log().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["Alice disconnected", "Alice reconnected"]);
        assert!(!fx.session.set_connected("nobody", false));
    }

    #[test]
    fn accepted_commands_notify_and_rejected_do_not() {
        let fx = playing();
        let mut changes = fx.session.subscribe();
        changes.borrow_and_update();

        assert!(!fx.session.ask_question(B, "Hat?"));
        assert!(!changes.has_changed().unwrap());

        assert!(fx.session.ask_question(A, "Hat?"));
        assert!(changes.has_changed().unwrap());
    }

    #[test]
    fn accepted_commands_stamp_activity() {
        let fx = playing();
        let before = fx.session.last_activity_at();
        fx.clock.advance(Duration::from_secs(30));

        fx.session.ask_question(B, "Ignored?");
        assert_eq!(fx.session.last_activity_at(), before);

        fx.session.ask_question(A, "Glasses?");
        assert_eq!((fx.session.last_activity_at() - before).num_seconds(), 30);
    }

    #[test]
    fn staleness() {
        let fx = seated();
        let idle = Duration::from_secs(7200);
        fx.clock.advance(Duration::from_secs(7199));
        assert!(!fx.session.is_stale(fx.clock.now(), idle));
        fx.clock.advance(Duration::from_secs(2));
        assert!(fx.session.is_stale(fx.clock.now(), idle));

        let fx = round_over();
        fx.session.make_post_round_decision(A, PostRoundDecision::EndGame);
        fx.session.make_post_round_decision(B, PostRoundDecision::EndGame);
        assert!(fx.session.is_stale(fx.clock.now(), idle));
    }

    #[test]
    fn history_records_phase_path() {
        let fx = round_over();
        fx.session.make_post_round_decision(A, PostRoundDecision::EndGame);
        fx.session.make_post_round_decision(B, PostRoundDecision::EndGame);

        assert_eq!(
            fx.session.phase_history().path(),
            vec![
                Phase::Lobby,
                Phase::CharacterSelection,
                Phase::Playing,
                Phase::RoundEnd,
                Phase::GameEnd,
            ]
        );
    }

    #[test]
    fn snapshot_hides_opponent_pair_until_round_end() {
        let fx = playing();
        let snapshot = fx.session.snapshot_for(A);
        assert_eq!(snapshot.viewer_slot, Some(Slot::One));
        assert_eq!(snapshot.active_slot, Some(Slot::One));
        assert_eq!(snapshot.viewer().map(|v| v.mystery.clone()), Some(vec![1, 2]));
        let opponent = snapshot.players.iter().find(|p| !p.is_viewer).unwrap();
        assert!(opponent.mystery.is_empty());
        assert!(opponent.has_confirmed);

        fx.session.make_guess(A, 3, 5);
        let snapshot = fx.session.snapshot_for(A);
        let opponent = snapshot.players.iter().find(|p| !p.is_viewer).unwrap();
        assert_eq!(opponent.mystery, vec![3, 4]);
        assert_eq!(snapshot.round_winner, Some(Slot::Two));
    }

    #[test]
    fn snapshot_does_not_leak_tokens() {
        let fx = round_over();
        fx.session.make_post_round_decision(B, PostRoundDecision::NewRound);
        let json = fx.session.snapshot_for(A).to_json().unwrap();

        assert!(!json.contains(A));
        assert!(!json.contains(B));
        let back = SessionSnapshot::from_json(&json).unwrap();
        assert_eq!(back.revision, fx.session.revision());
        assert_eq!(back.players[1].decision, Some(PostRoundDecision::NewRound));
    }

    #[test]
    fn turn_commands_are_ignored_without_an_active_turn() {
        let fx = round_over();
        let revision = fx.session.revision();

        assert!(!fx.session.start_next_turn(A));
        assert!(!fx.session.ask_question(B, "Is it Max?"));
        assert!(!fx.session.answer_question(B, "No"));
        assert!(!fx.session.eliminate_character(B, 9));
        assert!(!fx.session.make_guess(B, 1, 2));

        assert_eq!(fx.session.revision(), revision);
        assert_eq!(fx.session.phase(), Phase::RoundEnd);
    }

    #[test]
    fn snapshot_while_a_revision_is_borrowed() {
        let fx = playing();
        let changes = fx.session.subscribe();
        let held = changes.borrow();
        let snapshot = fx.session.snapshot_for(A);
        assert_eq!(snapshot.revision, *held);
    }

    #[test]
    fn snapshots_race_with_commands() {
        let fx = playing();
        let session = &fx.session;

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..200 {
                    let token = if i % 2 == 0 { A } else { B };
                    session.start_next_turn(token);
                }
            });
            scope.spawn(|| {
                let mut last = 0;
                for _ in 0..200 {
                    let snapshot = session.snapshot_for(B);
                    assert!(snapshot.revision >= last);
                    last = snapshot.revision;
                }
            });
        });

        assert_eq!(fx.session.snapshot_for(A).revision, fx.session.revision());
    }

    #[test]
    fn dropping_the_session_disarms_its_timer() {
        let fx = round_over();
        fx.session.make_post_round_decision(A, PostRoundDecision::NewRound);
        let Fixture {
            session, scheduler, ..
        } = fx;
        drop(session);
        assert_eq!(scheduler.pending(), 0);
    }
}
