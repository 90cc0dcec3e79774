//! Session phases and the record of how a session moved through them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Where a session is in its lifecycle.
///
/// `Lobby → CharacterSelection → Playing → RoundEnd → {CharacterSelection | GameEnd}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Lobby,
    CharacterSelection,
    Playing,
    RoundEnd,
    GameEnd,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lobby => "Lobby",
            Self::CharacterSelection => "CharacterSelection",
            Self::Playing => "Playing",
            Self::RoundEnd => "RoundEnd",
            Self::GameEnd => "GameEnd",
        }
    }

    /// Terminal phase. A session here only waits to be reclaimed.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::GameEnd)
    }

    /// Phases in which a player holds the turn.
    pub fn has_active_turn(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single phase change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
    /// Round number in effect after the change.
    pub round: u32,
    pub at: DateTime<Utc>,
}

/// Ordered record of phase changes for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseHistory {
    transitions: Vec<PhaseTransition>,
}

impl PhaseHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, transition: PhaseTransition) {
        self.transitions.push(transition);
    }

    /// Phases visited in order, starting from the first transition's source.
    pub fn path(&self) -> Vec<Phase> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.first() {
            path.push(first.from);
        }
        path.extend(self.transitions.iter().map(|t| t.to));
        path
    }

    /// Time between the first and the last recorded transition.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.transitions.first()?, self.transitions.last()?);
        last.at.signed_duration_since(first.at).to_std().ok()
    }

    pub fn transitions(&self) -> &[PhaseTransition] {
        &self.transitions
    }
}
