//! Precondition accounting for session commands using Validation.
//!
//! Commands never fail loudly: a command whose preconditions do not hold is
//! ignored. The reasons are still collected so they can be logged. Independent
//! checks are all evaluated and every violation is kept, rather than stopping
//! at the first one.

use crate::catalog::CharacterId;
use crate::session::phase::Phase;
use std::fmt;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// Outcome of a single precondition.
pub type Check = Validation<(), NonEmptyVec<Rejection>>;

/// Why a command was ignored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("requires phase {expected}, session is in {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("nobody holds the turn while the session is in {0}")]
    NoActiveTurn(Phase),

    #[error("token is not seated in this session")]
    UnknownPlayer,

    #[error("caller does not hold the turn")]
    NotActivePlayer,

    #[error("the active player cannot do this")]
    IsActivePlayer,

    #[error("mystery people already confirmed this round")]
    AlreadyConfirmed,

    #[error("both character ids are {0}")]
    DuplicateIds(CharacterId),

    #[error("character {0} is not in the catalog")]
    UnknownCharacter(CharacterId),

    #[error("a question was already asked this turn")]
    QuestionAlreadyAsked,

    #[error("no question is awaiting an answer")]
    NoPendingQuestion,

    #[error("text is blank")]
    BlankText,

    #[error("character {0} is one of the caller's mystery people")]
    OwnMysteryPerson(CharacterId),

    #[error("character {0} is already eliminated")]
    AlreadyEliminated(CharacterId),

    #[error("presence is already {0}")]
    PresenceUnchanged(bool),
}

/// A passing check when `holds`, otherwise a failure carrying `rejection`.
pub fn check(holds: bool, rejection: Rejection) -> Check {
    if holds {
        Validation::success(())
    } else {
        Validation::fail(rejection)
    }
}

/// Every violation found for one command.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejections(NonEmptyVec<Rejection>);

impl Rejections {
    pub fn iter(&self) -> impl Iterator<Item = &Rejection> {
        self.0.iter()
    }

    pub fn contains(&self, rejection: &Rejection) -> bool {
        self.0.iter().any(|r| r == rejection)
    }

    pub fn violations(&self) -> &NonEmptyVec<Rejection> {
        &self.0
    }
}

impl From<Rejection> for Rejections {
    fn from(rejection: Rejection) -> Self {
        Self(NonEmptyVec::singleton(rejection))
    }
}

impl fmt::Display for Rejections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rejection) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{rejection}")?;
        }
        Ok(())
    }
}

/// Accumulates independent checks for a single command.
#[derive(Default)]
pub(crate) struct Preconditions {
    checks: Vec<Check>,
}

impl Preconditions {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn require(mut self, holds: bool, rejection: Rejection) -> Self {
        self.checks.push(check(holds, rejection));
        self
    }

    pub(crate) fn require_phase(self, expected: Phase, actual: Phase) -> Self {
        self.require(expected == actual, Rejection::WrongPhase { expected, actual })
    }

    /// The session is in a phase where one player holds the turn.
    pub(crate) fn require_turn(self, actual: Phase) -> Self {
        self.require(actual.has_active_turn(), Rejection::NoActiveTurn(actual))
    }

    /// `Ok` when every check held, otherwise all violations.
    pub(crate) fn check(self) -> Result<(), Rejections> {
        match Validation::all_vec(self.checks) {
            Validation::Success(_) => Ok(()),
            Validation::Failure(violations) => Err(Rejections(violations)),
        }
    }
}
