//! Time sources for session deadlines.
//!
//! Services take an `Arc<dyn Clock>` so tests can swap the wall clock for a
//! [`ManualClock`] and move virtual time forward deterministically.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};

/// Source of the current time and of timers.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;

    /// Future completing once `duration` has elapsed on this clock.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Wall clock backed by tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed()
    }
}

/// Absolute expiry for a session. Fires once, `duration` after it was armed,
/// no matter what happens in between.
pub struct Deadline {
    timer: BoxFuture<'static, ()>,
    expired: bool,
}

impl Deadline {
    pub fn arm(clock: &dyn Clock, duration: Duration) -> Self {
        Self {
            timer: clock.sleep(duration),
            expired: false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }
}

impl Future for Deadline {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.expired {
            return Poll::Ready(());
        }
        match self.timer.as_mut().poll(cx) {
            Poll::Ready(()) => {
                self.expired = true;
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl fmt::Debug for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deadline")
            .field("expired", &self.expired)
            .finish()
    }
}

/// Virtual clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock {
    inner: Arc<ManualInner>,
}

struct ManualInner {
    state: Mutex<ManualState>,
    sleepers_changed: Notify,
}

struct ManualState {
    origin: DateTime<Utc>,
    elapsed: Duration,
    sleepers: Vec<Sleeper>,
}

struct Sleeper {
    wake_at: Duration,
    waker: oneshot::Sender<()>,
}

impl ManualClock {
    pub fn new(origin: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(ManualInner {
                state: Mutex::new(ManualState {
                    origin,
                    elapsed: Duration::ZERO,
                    sleepers: Vec::new(),
                }),
                sleepers_changed: Notify::new(),
            }),
        }
    }

    /// Moves virtual time forward and wakes every sleeper whose time has come.
    pub fn advance(&self, by: Duration) {
        let due = {
            let mut state = self.inner.state.lock();
            state.elapsed = state.elapsed.saturating_add(by);
            let now = state.elapsed;
            let (due, pending): (Vec<_>, Vec<_>) = state
                .sleepers
                .drain(..)
                .partition(|sleeper| sleeper.wake_at <= now);
            state.sleepers = pending;
            due
        };

        for sleeper in due {
            let _ = sleeper.waker.send(());
        }
        self.inner.sleepers_changed.notify_waiters();
    }

    /// Number of timers currently waiting on this clock.
    pub fn sleepers(&self) -> usize {
        let mut state = self.inner.state.lock();
        state.sleepers.retain(|sleeper| !sleeper.waker.is_closed());
        state.sleepers.len()
    }

    /// Waits until at least `count` timers are waiting on this clock.
    pub async fn wait_for_sleepers(&self, count: usize) {
        loop {
            let changed = self.inner.sleepers_changed.notified();
            if self.sleepers() >= count {
                return;
            }
            changed.await;
        }
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ManualClock")
            .field("elapsed", &state.elapsed)
            .field("sleepers", &state.sleepers.len())
            .finish()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let state = self.inner.state.lock();
        let elapsed = chrono::Duration::from_std(state.elapsed).unwrap_or_else(|_| chrono::Duration::zero());
        state.origin + elapsed
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        let (waker, woken) = oneshot::channel();
        {
            let mut state = self.inner.state.lock();
            let wake_at = state.elapsed.saturating_add(duration);
            if duration.is_zero() {
                let _ = waker.send(());
            } else {
                state.sleepers.push(Sleeper { wake_at, waker });
            }
        }
        self.inner.sleepers_changed.notify_waiters();

        async move {
            // A dropped clock never fires its timers.
            if woken.await.is_err() {
                futures::future::pending::<()>().await;
            }
        }
        .boxed()
    }
}
