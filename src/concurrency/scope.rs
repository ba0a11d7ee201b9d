use std::ops::{Deref, DerefMut};

use tokio::sync::{Mutex, MutexGuard};

/// Exclusive access window over one source's mutable state.
///
/// Entering suspends until the previous holder leaves. Code running inside
/// a scope receives `&mut T` and never sees the scope itself, so it cannot
/// enter again.
#[derive(Debug)]
pub struct SyncScope<T> {
    name: String,
    inner: Mutex<T>,
}

/// Held while a scope is entered; dropping it exits the scope.
pub struct ScopeGuard<'a, T> {
    guard: MutexGuard<'a, T>,
}

impl<T> SyncScope<T> {
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(value),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for exclusive access. Waiters are served in arrival order.
    pub async fn enter(&self) -> ScopeGuard<'_, T> {
        if self.inner.try_lock().is_err() {
            tracing::debug!("waiting for sync scope {}", self.name);
        }
        ScopeGuard {
            guard: self.inner.lock().await,
        }
    }

    /// Enter only if nobody holds the scope.
    pub fn try_enter(&self) -> Option<ScopeGuard<'_, T>> {
        self.inner.try_lock().ok().map(|guard| ScopeGuard { guard })
    }

    pub fn is_busy(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

impl<T> Deref for ScopeGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for ScopeGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
