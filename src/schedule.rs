//! Timer scheduling
//!
//! Events that wait on time go through the [`Scheduler`] trait instead of
//! talking to a platform timer directly. The bundled [`FrameScheduler`]
//! is a virtual clock advanced by the host's frame loop, which keeps
//! level scripts deterministic and testable without real sleeping.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use tracing::trace;

/// Deferred callback run once when its timer comes due.
pub type TimerCallback = Box<dyn FnOnce()>;

/// Typed scheduler interface consumed by timer-driven events.
pub trait Scheduler {
    /// Runs `callback` once, `after` from now. The returned handle can
    /// cancel the callback before it fires.
    fn schedule(&self, after: Duration, callback: TimerCallback) -> TimerHandle;

    /// Current time on this scheduler's clock.
    fn now(&self) -> Duration;
}

/// Cancellation handle for a scheduled callback.
///
/// Cancelling is best-effort from the caller's point of view: events
/// additionally guard their callbacks with their own active state.
#[derive(Debug, Clone, Default)]
pub struct TimerHandle {
    cancelled: Rc<Cell<bool>>,
}

impl TimerHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

struct PendingTimer {
    handle: TimerHandle,
    callback: TimerCallback,
}

/// Virtual clock driven by [`advance`](FrameScheduler::advance).
///
/// Due callbacks run in due-time order, ties broken by scheduling order.
/// While a callback runs, [`now`](Scheduler::now) reports its due time, so
/// timers armed from inside a callback are measured from that instant
/// rather than from the end of the frame.
#[derive(Default)]
pub struct FrameScheduler {
    now: Cell<Duration>,
    next_seq: Cell<u64>,
    queue: RefCell<BTreeMap<(Duration, u64), PendingTimer>>,
}

impl FrameScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock by `dt`, running every callback that comes due.
    ///
    /// Returns the number of callbacks run.
    pub fn advance(&self, dt: Duration) -> usize {
        let target = self.now.get().saturating_add(dt);
        let mut fired = 0;

        loop {
            // Pop under a short borrow; callbacks schedule new timers.
            let next = {
                let mut queue = self.queue.borrow_mut();
                let is_due = queue
                    .first_key_value()
                    .is_some_and(|(&(due, _), _)| due <= target);
                if is_due { queue.pop_first() } else { None }
            };
            let Some(((due, seq), timer)) = next else {
                break;
            };

            if timer.handle.is_cancelled() {
                trace!(seq, "skipping cancelled timer");
                continue;
            }

            self.now.set(due);
            trace!(seq, due = ?due, "timer due");
            (timer.callback)();
            fired += 1;
        }

        self.now.set(target);
        fired
    }

    /// Number of timers still waiting (cancelled ones included until
    /// their due time passes).
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Due time of the earliest pending timer.
    #[must_use]
    pub fn next_due(&self) -> Option<Duration> {
        self.queue.borrow().keys().next().map(|&(due, _)| due)
    }

    /// Drops every pending timer without running it.
    pub fn clear(&self) {
        self.queue.borrow_mut().clear();
    }
}

impl Scheduler for FrameScheduler {
    fn schedule(&self, after: Duration, callback: TimerCallback) -> TimerHandle {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        let due = self.now.get().saturating_add(after);
        let handle = TimerHandle::new();
        self.queue.borrow_mut().insert(
            (due, seq),
            PendingTimer {
                handle: handle.clone(),
                callback,
            },
        );
        handle
    }

    fn now(&self) -> Duration {
        self.now.get()
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("now", &self.now.get())
            .field("pending", &self.pending())
            .finish()
    }
}
