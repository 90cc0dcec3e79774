//! Players and their per-round board state.

use crate::catalog::CharacterId;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Opaque client-supplied identity. Stable across reconnects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerToken(String);

impl PlayerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Fresh random token for hosts that issue identities themselves.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl Borrow<str> for PlayerToken {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PlayerToken {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Seat within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slot {
    One,
    Two,
}

impl Slot {
    pub fn number(&self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

/// Unordered pair of two distinct character IDs.
///
/// Stored smallest-first so equality ignores the order the IDs were given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MysteryPair {
    low: CharacterId,
    high: CharacterId,
}

impl MysteryPair {
    /// `None` when both IDs are the same.
    pub fn new(a: CharacterId, b: CharacterId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn contains(&self, id: CharacterId) -> bool {
        self.low == id || self.high == id
    }

    pub fn ids(&self) -> [CharacterId; 2] {
        [self.low, self.high]
    }
}

/// A seated player.
///
/// Values handed out by [`Session`](crate::session::Session) are snapshots;
/// mutation only happens inside the session's own commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Identity the player joined with.
    pub token: PlayerToken,
    /// Sanitized display name.
    pub name: String,
    /// Seat, fixed for the life of the session.
    pub slot: Slot,
    /// Whether the host currently sees a live connection.
    pub connected: bool,
    /// This round's secret pair, `None` until confirmed.
    pub mystery: Option<MysteryPair>,
    /// Faces crossed off this round. Never contains the player's own pair.
    pub eliminated: BTreeSet<CharacterId>,
    /// Board layout for this round, a permutation of every catalog ID.
    pub board_order: Vec<CharacterId>,
    /// Rounds won so far in the current match.
    pub round_wins: u32,
}

impl Player {
    pub(crate) fn new(token: PlayerToken, name: String, slot: Slot) -> Self {
        Self {
            token,
            name,
            slot,
            connected: true,
            mystery: None,
            eliminated: BTreeSet::new(),
            board_order: Vec::new(),
            round_wins: 0,
        }
    }

    pub fn has_confirmed(&self) -> bool {
        self.mystery.is_some()
    }

    pub fn mystery_ids(&self) -> Vec<CharacterId> {
        self.mystery.map(|pair| pair.ids().to_vec()).unwrap_or_default()
    }

    pub(crate) fn clear_round(&mut self) {
        self.mystery = None;
        self.eliminated.clear();
        self.board_order.clear();
    }
}
