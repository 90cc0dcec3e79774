//! Guess Who: a session engine for a two-player deduction game.
//!
//! Each player secretly picks two faces from a shared board of 24 and the
//! players take turns asking questions, crossing faces off and finally
//! guessing the other player's pair. First to five round wins takes the match.
//!
//! The crate holds the game logic only. Transport, rendering and persistence
//! belong to the host, which drives everything through a [`SessionRegistry`].
//!
//! # Core Concepts
//!
//! - **Session**: a per-game state machine guarded by its own lock. Commands
//!   that do not apply in the current state are ignored and return `false`.
//! - **Registry**: owns every live session, keyed by a short join code, and
//!   reclaims finished or idle sessions.
//! - **Environment**: clock, randomness and timers are injected through
//!   [`GameEnv`] so tests can run deterministically.
//!
//! # Example
//!
//! ```rust
//! use guesswho::{GameConfig, GameEnv, JoinResult, Phase, SessionRegistry};
//! use guesswho::env::{ManualClock, ManualScheduler, SeededRandom};
//! use std::sync::Arc;
//!
//! let env = GameEnv::new(
//!     Arc::new(ManualClock::default()),
//!     Arc::new(SeededRandom::new(7)),
//!     Arc::new(ManualScheduler::new()),
//! );
//! let registry = SessionRegistry::new(GameConfig::default(), env);
//!
//! let session = registry.create_session("alice-token".into(), "Alice");
//! let code = session.code().to_string();
//!
//! let (result, _) = registry.join_session(&code.to_lowercase(), "bob-token".into(), "Bob");
//! assert_eq!(result, JoinResult::Success);
//!
//! registry.select_mystery_people(&code, "alice-token", 1, 2);
//! registry.select_mystery_people(&code, "bob-token", 3, 4);
//! assert_eq!(session.phase(), Phase::Playing);
//!
//! registry.make_guess(&code, "alice-token", 4, 3);
//! assert_eq!(session.phase(), Phase::RoundEnd);
//! assert_eq!(session.player("alice-token").map(|p| p.round_wins), Some(1));
//! ```

pub mod catalog;
pub mod config;
pub mod env;
pub mod registry;
pub mod session;

// Re-export commonly used types
pub use config::{ConfigError, GameConfig};
pub use env::GameEnv;
pub use registry::{SessionCode, SessionRegistry};
pub use session::{
    ChatKind, ChatMessage, JoinResult, Phase, Player, PlayerToken, PostRoundDecision,
    RoundEndReason, Session, SessionSnapshot,
};
