//! Cancellable delayed callbacks.
//!
//! A [`Scheduler`] runs a callback once after a delay and hands back a
//! [`TimerHandle`]. Dropping or cancelling the handle guarantees the callback
//! will not start afterwards. A callback that has already started is not
//! interrupted, so callers must re-validate their state inside it.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Work run when a timer fires.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Arms delayed callbacks.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;
}

/// Owner of a pending timer. Cancels the timer when dropped.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl TimerHandle {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        self.disarm();
    }

    fn disarm(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.disarm();
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Scheduler that spawns one tokio task per timer.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler bound to the runtime of the calling task, if any.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        let abort = task.abort_handle();
        TimerHandle::new(move || abort.abort())
    }
}

struct PendingTimer {
    due: Duration,
    callback: TimerCallback,
    cancelled: Arc<AtomicBool>,
}

#[derive(Default)]
struct ManualTimers {
    elapsed: Duration,
    pending: Vec<PendingTimer>,
}

/// Scheduler driven by explicit [`ManualScheduler::advance`] calls.
///
/// # Example
///
/// ```rust
/// use guesswho::env::{ManualScheduler, Scheduler};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let scheduler = ManualScheduler::new();
/// let fired = Arc::new(AtomicBool::new(false));
/// let flag = Arc::clone(&fired);
/// let _handle = scheduler.schedule(
///     Duration::from_secs(60),
///     Box::new(move || flag.store(true, Ordering::SeqCst)),
/// );
///
/// scheduler.advance(Duration::from_secs(59));
/// assert!(!fired.load(Ordering::SeqCst));
/// scheduler.advance(Duration::from_secs(1));
/// assert!(fired.load(Ordering::SeqCst));
/// ```
#[derive(Default)]
pub struct ManualScheduler {
    timers: Mutex<ManualTimers>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move virtual time forward and run every live timer that came due.
    ///
    /// Callbacks run in due order on the calling thread, after the internal
    /// lock is released.
    pub fn advance(&self, by: Duration) -> usize {
        let mut due = {
            let mut timers = self.timers.lock();
            timers.elapsed += by;
            let now = timers.elapsed;
            let (ready, waiting): (Vec<_>, Vec<_>) = timers
                .pending
                .drain(..)
                .partition(|timer| timer.due <= now);
            timers.pending = waiting;
            ready
        };
        due.sort_by_key(|timer| timer.due);

        let mut fired = 0;
        for timer in due {
            if !timer.cancelled.load(Ordering::SeqCst) {
                (timer.callback)();
                fired += 1;
            }
        }
        fired
    }

    /// Number of timers that are armed and not cancelled.
    pub fn pending(&self) -> usize {
        self.timers
            .lock()
            .pending
            .iter()
            .filter(|timer| !timer.cancelled.load(Ordering::SeqCst))
            .count()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut timers = self.timers.lock();
        let due = timers.elapsed + delay;
        timers.pending.push(PendingTimer {
            due,
            callback,
            cancelled: Arc::clone(&cancelled),
        });
        TimerHandle::new(move || cancelled.store(true, Ordering::SeqCst))
    }
}
