//! Coalescing primitives for noisy triggers and the exclusive sync scope.
//!
//! Debounce and throttle are small state machines over an injected
//! [`Clock`]; the async wrappers drive them with tokio timers.

pub mod debounce;
pub mod scope;
pub mod throttle;

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

/// Result of a coalesced call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome<R> {
    /// The wrapped function ran with this call's arguments.
    Ran(R),
    /// A later call replaced this one before it ran. No work was done.
    Superseded,
    /// The throttle window was closed and tail calls are disabled.
    Dropped,
}

impl<R> CallOutcome<R> {
    pub fn ran(&self) -> bool {
        matches!(self, CallOutcome::Ran(_))
    }

    pub fn into_ran(self) -> Option<R> {
        match self {
            CallOutcome::Ran(r) => Some(r),
            _ => None,
        }
    }
}

/// Boxed future returned by a wrapped task.
pub type BoxFuture<R> = Pin<Box<dyn Future<Output = R> + Send>>;

/// The function wrapped by a debouncer or throttler.
pub type Task<A, R> = Arc<dyn Fn(A) -> BoxFuture<R> + Send + Sync>;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Clock backed by tokio's timer, which follows paused test time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
