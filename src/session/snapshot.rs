//! Serialisable, per-viewer views of a session.
//!
//! Snapshots identify players by [`Slot`] rather than token, so they can be
//! sent to either client without leaking the other player's identity. The
//! opponent's mystery pair stays hidden until the round is resolved.

use super::{ChatMessage, Phase, Player, PostRoundDecision, RoundEndReason, SessionState, Slot};
use crate::catalog::CharacterId;
use crate::registry::SessionCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One seat as seen by a particular viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Seat of this player.
    pub slot: Slot,
    /// Display name.
    pub name: String,
    /// Connection state as last reported by the host.
    pub connected: bool,
    /// Rounds won in the current match.
    pub round_wins: u32,
    /// Mystery people are locked in for this round.
    pub has_confirmed: bool,
    /// Empty when not yet chosen or hidden from this viewer.
    pub mystery: Vec<CharacterId>,
    /// Faces crossed off this round, ascending.
    pub eliminated: Vec<CharacterId>,
    /// This player's board layout.
    pub board_order: Vec<CharacterId>,
    /// This entry describes the viewer.
    pub is_viewer: bool,
    /// Choice made after the round, if any.
    pub decision: Option<PostRoundDecision>,
}

/// Everything a client needs to render a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Change counter at capture time. Matches the value seen by subscribers.
    pub revision: u64,
    /// Join code of the session.
    pub code: SessionCode,
    /// Current phase.
    pub phase: Phase,
    /// Round counter, starting at 1.
    pub round_number: u32,
    /// Seated players in slot order.
    pub players: Vec<PlayerView>,
    /// Seat of the viewer, `None` for spectators and unknown tokens.
    pub viewer_slot: Option<Slot>,
    /// Seat holding the turn while playing.
    pub active_slot: Option<Slot>,
    /// The active player has used this turn's question.
    pub question_asked: bool,
    /// A question is waiting for the other player's answer.
    pub awaiting_answer: bool,
    /// Questions, answers and system notices for the current round.
    pub chat_log: Vec<ChatMessage>,
    /// How the last round ended.
    pub end_reason: Option<RoundEndReason>,
    /// Seat that won the last round.
    pub round_winner: Option<Slot>,
    /// Someone has reached the win threshold.
    pub match_over: bool,
    /// Seat that won the match.
    pub match_winner: Option<Slot>,
    /// When the advisory countdown began.
    pub countdown_started_at: Option<DateTime<Utc>>,
    /// Whole seconds left on the countdown, `None` once it has run out.
    pub countdown_remaining_secs: Option<u64>,
    /// Last accepted command.
    pub last_activity_at: DateTime<Utc>,
    /// Clock reading used to compute this snapshot.
    pub taken_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub(super) fn capture(
        code: &SessionCode,
        revision: u64,
        state: &SessionState,
        viewer: &str,
        countdown: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let reveal_all = matches!(state.phase, Phase::RoundEnd | Phase::GameEnd);
        let players = state
            .players()
            .map(|player| view(state, player, viewer, reveal_all))
            .collect();
        let slot_of = |token: Option<&super::PlayerToken>| {
            token.and_then(|token| state.slot_of(token.as_str()))
        };

        Self {
            revision,
            code: code.clone(),
            phase: state.phase,
            round_number: state.round_number,
            players,
            viewer_slot: state.slot_of(viewer),
            active_slot: slot_of(state.active_player.as_ref()),
            question_asked: state.question_asked,
            awaiting_answer: state.awaiting_answer(),
            chat_log: state.chat_log.clone(),
            end_reason: state.end_reason,
            round_winner: slot_of(state.round_winner.as_ref()),
            match_over: state.match_over,
            match_winner: slot_of(state.match_winner.as_ref()),
            countdown_started_at: state.countdown_started_at,
            countdown_remaining_secs: state
                .countdown_remaining(countdown, now)
                .map(|remaining| remaining.as_secs()),
            last_activity_at: state.last_activity_at,
            taken_at: now,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }

    /// The view of the requesting player, if they are seated.
    pub fn viewer(&self) -> Option<&PlayerView> {
        self.players.iter().find(|player| player.is_viewer)
    }
}

fn view(state: &SessionState, player: &Player, viewer: &str, reveal_all: bool) -> PlayerView {
    let is_viewer = player.token.as_str() == viewer;
    PlayerView {
        slot: player.slot,
        name: player.name.clone(),
        connected: player.connected,
        round_wins: player.round_wins,
        has_confirmed: player.has_confirmed(),
        mystery: if is_viewer || reveal_all {
            player.mystery_ids()
        } else {
            Vec::new()
        },
        eliminated: player.eliminated.iter().copied().collect(),
        board_order: player.board_order.clone(),
        is_viewer,
        decision: state.decisions.get(player.token.as_str()).copied(),
    }
}
