use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use super::debounce::{lock, wait_and_run, Debouncer, Deferred, Due};
use super::{CallOutcome, Clock, Task, TokioClock};

/// What a throttler decided for one call.
pub enum Admission<A, R> {
    /// The window was open; run now with these arguments.
    Run(A),
    /// Deferred behind the debounce rule; the receiver gets the outcome.
    Deferred(oneshot::Receiver<CallOutcome<R>>),
    /// Window closed and tail disabled.
    Dropped,
}

/// Throttle state machine: at most one run per `delay` window, with an
/// optional debounced tail call.
pub struct Throttler<A, R> {
    delay: Duration,
    tail: bool,
    last_run: Option<Instant>,
    pending: Debouncer<A, R>,
}

impl<A, R> Throttler<A, R> {
    pub fn new(delay: Duration, tail: bool, clock: Arc<dyn Clock>) -> Self {
        Self {
            delay,
            tail,
            last_run: None,
            pending: Debouncer::new(delay, clock),
        }
    }

    pub fn call(&mut self, args: A) -> Admission<A, R> {
        let now = self.pending.clock().now();
        let open = self
            .last_run
            .map_or(true, |last| now.duration_since(last) >= self.delay);
        if open {
            // a newer call replaces any stale tail
            self.pending.cancel();
            self.last_run = Some(now);
            Admission::Run(args)
        } else if self.tail {
            Admission::Deferred(self.pending.call(args))
        } else {
            Admission::Dropped
        }
    }

    pub fn last_run(&self) -> Option<Instant> {
        self.last_run
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.deadline()
    }

    /// Take the tail call if due; its run opens a new window.
    pub fn take_due(&mut self) -> Option<Due<A, R>> {
        let due = self.pending.take_due()?;
        self.last_run = Some(self.pending.clock().now());
        Some(due)
    }
}

impl<A, R> Deferred<A, R> for Throttler<A, R> {
    fn deadline(&self) -> Option<Instant> {
        Throttler::deadline(self)
    }

    fn take_due(&mut self) -> Option<Due<A, R>> {
        Throttler::take_due(self)
    }
}

/// Throttled async function.
pub struct Throttled<A, R> {
    machine: Arc<Mutex<Throttler<A, R>>>,
    task: Task<A, R>,
}

impl<A, R> Clone for Throttled<A, R> {
    fn clone(&self) -> Self {
        Self {
            machine: Arc::clone(&self.machine),
            task: Arc::clone(&self.task),
        }
    }
}

impl<A, R> Throttled<A, R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    pub fn new(delay: Duration, tail: bool, task: Task<A, R>) -> Self {
        Self {
            machine: Arc::new(Mutex::new(Throttler::new(delay, tail, Arc::new(TokioClock)))),
            task,
        }
    }

    pub async fn call(&self, args: A) -> CallOutcome<R> {
        let admission = lock(&self.machine).call(args);
        match admission {
            Admission::Run(args) => CallOutcome::Ran((self.task)(args).await),
            Admission::Deferred(rx) => wait_and_run(&self.machine, &self.task, rx).await,
            Admission::Dropped => CallOutcome::Dropped,
        }
    }
}
