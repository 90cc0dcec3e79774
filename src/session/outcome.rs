//! Results and decisions exchanged with callers.

use serde::{Deserialize, Serialize};

/// Outcome of seating a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinResult {
    Success,
    /// No live session has the requested code.
    NotFound,
    /// Both seats are held by other tokens.
    Full,
    /// The token already holds a seat. Safe reconnect.
    AlreadyJoined,
}

impl JoinResult {
    /// Whether the caller ends up seated in the session.
    pub fn is_seated(&self) -> bool {
        matches!(self, Self::Success | Self::AlreadyJoined)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundEndReason {
    CorrectGuess,
    WrongGuess,
}

/// What a player wants to do once a round is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostRoundDecision {
    /// Play another round, or start a fresh match if this one is over.
    NewRound,
    EndGame,
}
