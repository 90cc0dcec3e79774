//! Static character catalog.
//!
//! The catalog is a process-lifetime constant table. Sessions only consume it
//! to validate character IDs and to lay out boards.

mod data;

use crate::env::{shuffle, RandomSource};
use serde::Serialize;

/// Catalog identifier of a character, `1..=24`.
pub type CharacterId = u8;

/// Number of faces on a board.
pub const BOARD_SIZE: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HairColor {
    Black,
    Brown,
    Blonde,
    Red,
    White,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EyeColor {
    Blue,
    Brown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HairLength {
    Short,
    Long,
}

/// One face of the board and its visible attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: &'static str,
    pub hair_color: HairColor,
    pub eye_color: EyeColor,
    pub glasses: bool,
    pub hat: bool,
    pub facial_hair: bool,
    pub hair_length: HairLength,
    pub bald: bool,
    pub rosy_cheeks: bool,
    pub big_nose: bool,
}

/// Every character, ordered by ID.
pub fn all() -> &'static [Character] {
    &data::CHARACTERS
}

pub fn get(id: CharacterId) -> Option<&'static Character> {
    all().iter().find(|character| character.id == id)
}

pub fn contains(id: CharacterId) -> bool {
    get(id).is_some()
}

pub fn ids() -> impl Iterator<Item = CharacterId> {
    all().iter().map(|character| character.id)
}

/// A uniformly random permutation of every character ID.
pub fn shuffled_board(random: &dyn RandomSource) -> Vec<CharacterId> {
    let mut board: Vec<CharacterId> = ids().collect();
    shuffle(random, &mut board);
    board
}
