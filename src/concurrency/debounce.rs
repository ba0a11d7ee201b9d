use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use super::{CallOutcome, Clock, Task, TokioClock};

/// A deferred call whose deadline has passed, ready to run.
pub struct Due<A, R> {
    pub args: A,
    resolver: oneshot::Sender<CallOutcome<R>>,
}

impl<A, R> Due<A, R> {
    /// Deliver the outcome to the caller waiting on this call.
    pub fn resolve(self, outcome: CallOutcome<R>) {
        let _ = self.resolver.send(outcome);
    }
}

enum State<A, R> {
    Idle,
    Pending {
        deadline: Instant,
        args: A,
        resolver: oneshot::Sender<CallOutcome<R>>,
    },
}

/// Debounce state machine: every call restarts the timer and supersedes the
/// call that was waiting.
pub struct Debouncer<A, R> {
    delay: Duration,
    clock: Arc<dyn Clock>,
    state: State<A, R>,
}

impl<A, R> Debouncer<A, R> {
    pub fn new(delay: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            delay,
            clock,
            state: State::Idle,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Register a call due `delay` from now.
    ///
    /// A call already waiting resolves with [`CallOutcome::Superseded`] here.
    pub fn call(&mut self, args: A) -> oneshot::Receiver<CallOutcome<R>> {
        self.cancel();
        let (resolver, rx) = oneshot::channel();
        self.state = State::Pending {
            deadline: self.clock.now() + self.delay,
            args,
            resolver,
        };
        rx
    }

    /// Supersede the waiting call, if any.
    pub fn cancel(&mut self) -> bool {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Pending { resolver, .. } => {
                let _ = resolver.send(CallOutcome::Superseded);
                true
            }
            State::Idle => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            State::Pending { deadline, .. } => Some(*deadline),
            State::Idle => None,
        }
    }

    /// Take the waiting call if its deadline has passed.
    pub fn take_due(&mut self) -> Option<Due<A, R>> {
        let now = self.clock.now();
        if !self.deadline().is_some_and(|d| d <= now) {
            return None;
        }
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Pending { args, resolver, .. } => Some(Due { args, resolver }),
            State::Idle => None,
        }
    }
}

/// A state machine holding at most one deferred call.
pub(crate) trait Deferred<A, R> {
    fn deadline(&self) -> Option<Instant>;
    fn take_due(&mut self) -> Option<Due<A, R>>;
}

impl<A, R> Deferred<A, R> for Debouncer<A, R> {
    fn deadline(&self) -> Option<Instant> {
        Debouncer::deadline(self)
    }

    fn take_due(&mut self) -> Option<Due<A, R>> {
        Debouncer::take_due(self)
    }
}

pub(crate) fn lock<M>(machine: &Mutex<M>) -> MutexGuard<'_, M> {
    machine.lock().unwrap_or_else(|e| e.into_inner())
}

/// Sleep until the pending call is due and run it, unless `rx` resolves
/// first because a later call superseded this one.
pub(crate) async fn wait_and_run<M, A, R>(
    machine: &Mutex<M>,
    task: &Task<A, R>,
    mut rx: oneshot::Receiver<CallOutcome<R>>,
) -> CallOutcome<R>
where
    M: Deferred<A, R>,
{
    loop {
        let deadline = lock(machine).deadline();
        let Some(deadline) = deadline else {
            return rx.await.unwrap_or(CallOutcome::Superseded);
        };
        tokio::select! {
            biased;
            outcome = &mut rx => return outcome.unwrap_or(CallOutcome::Superseded),
            _ = tokio::time::sleep_until(deadline) => {
                let due = lock(machine).take_due();
                if let Some(due) = due {
                    let Due { args, resolver } = due;
                    let result = task(args).await;
                    let _ = resolver.send(CallOutcome::Ran(result));
                }
            }
        }
    }
}

/// Debounced async function.
pub struct Debounced<A, R> {
    machine: Arc<Mutex<Debouncer<A, R>>>,
    task: Task<A, R>,
}

impl<A, R> Clone for Debounced<A, R> {
    fn clone(&self) -> Self {
        Self {
            machine: Arc::clone(&self.machine),
            task: Arc::clone(&self.task),
        }
    }
}

impl<A, R> Debounced<A, R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    pub fn new(delay: Duration, task: Task<A, R>) -> Self {
        Self {
            machine: Arc::new(Mutex::new(Debouncer::new(delay, Arc::new(TokioClock)))),
            task,
        }
    }

    /// Resolves when this call ran, or as soon as a later call replaced it.
    pub async fn call(&self, args: A) -> CallOutcome<R> {
        let rx = lock(&self.machine).call(args);
        wait_and_run(&self.machine, &self.task, rx).await
    }

    /// Supersede whatever is waiting.
    pub fn cancel(&self) -> bool {
        lock(&self.machine).cancel()
    }
}
