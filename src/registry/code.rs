//! Short human-typable session codes.

use crate::env::RandomSource;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Uppercase letters and digits without the look-alikes O, 0, I and 1.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const CODE_LENGTH: usize = 4;

/// A validated, upper-cased session code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCode(String);

impl SessionCode {
    /// Draw a random code.
    pub fn generate(random: &dyn RandomSource) -> Self {
        let code = (0..CODE_LENGTH)
            .map(|_| char::from(CODE_ALPHABET[random.next_below(CODE_ALPHABET.len())]))
            .collect();
        Self(code)
    }

    /// Normalise user input (trim, upper-case) and validate it.
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = normalize(input);
        let valid = normalized.len() == CODE_LENGTH
            && normalized.bytes().all(|b| CODE_ALPHABET.contains(&b));
        valid.then_some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Trim surrounding whitespace and upper-case.
pub fn normalize(input: &str) -> String {
    input.trim().to_uppercase()
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SessionCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}
