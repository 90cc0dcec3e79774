//! Collaborators injected into sessions and the registry.
//!
//! Sessions need three things from the outside world: the current time, a
//! source of randomness and a way to arm the post-round timeout. Each one is
//! a trait object so hosts get real implementations and tests get
//! deterministic ones.

mod clock;
mod random;
mod timer;

pub use clock::{elapsed_between, Clock, ManualClock, SystemClock};
pub use random::{shuffle, RandomSource, SeededRandom, ThreadRandom};
pub use timer::{ManualScheduler, Scheduler, TimerCallback, TimerHandle, TokioScheduler};

use std::sync::Arc;
use tokio::runtime::Handle;

/// Bundle of collaborators shared by every session of a registry.
#[derive(Clone)]
pub struct GameEnv {
    pub clock: Arc<dyn Clock>,
    pub random: Arc<dyn RandomSource>,
    pub scheduler: Arc<dyn Scheduler>,
}

impl GameEnv {
    pub fn new(
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            clock,
            random,
            scheduler,
        }
    }

    /// Wall clock, thread RNG and timers spawned on `handle`.
    pub fn system(handle: Handle) -> Self {
        Self::new(
            Arc::new(SystemClock),
            Arc::new(ThreadRandom),
            Arc::new(TokioScheduler::new(handle)),
        )
    }
}

impl std::fmt::Debug for GameEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameEnv").finish_non_exhaustive()
    }
}
