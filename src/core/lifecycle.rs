//! Request lifecycle management
//!
//! This module tracks the application's lifecycle phase and the observers
//! registered for the request notifications, and ensures the termination
//! notification fires exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::application::Application;
use crate::lifecycle_error;

use super::error::AppResult;

/// Ordered lifecycle phases. Transitions are strictly forward; `Ended` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecyclePhase {
    Created,
    Initialized,
    BeforeRequestFired,
    Processing,
    AfterRequestFired,
    Ended,
}

impl LifecyclePhase {
    fn name(&self) -> &'static str {
        match self {
            LifecyclePhase::Created => "created",
            LifecyclePhase::Initialized => "initialized",
            LifecyclePhase::BeforeRequestFired => "beforeRequestFired",
            LifecyclePhase::Processing => "processing",
            LifecyclePhase::AfterRequestFired => "afterRequestFired",
            LifecyclePhase::Ended => "ended",
        }
    }
}

/// Handle returned by observer registration.
pub type ObserverId = usize;

/// Callback invoked with the application as context.
pub type Observer = Arc<dyn Fn(&Application) + Send + Sync>;

/// Tracks the current phase and the observer lists for the `beforeRequest`
/// and `afterRequest` notifications.
///
/// Observers are invoked synchronously in registration order. The
/// controller only stores them; the owning application drives the
/// invocation so observers can receive the application itself as context.
pub struct LifecycleController {
    phase: Mutex<LifecyclePhase>,
    before_request: Mutex<Vec<(ObserverId, Observer)>>,
    after_request: Mutex<Vec<(ObserverId, Observer)>>,
    next_observer: AtomicUsize,
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleController {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(LifecyclePhase::Created),
            before_request: Mutex::new(Vec::new()),
            after_request: Mutex::new(Vec::new()),
            next_observer: AtomicUsize::new(0),
        }
    }

    pub fn phase(&self) -> LifecyclePhase {
        *self.phase.lock().unwrap()
    }

    /// Move from `from` to `to`, failing if the current phase differs.
    pub fn advance(&self, from: LifecyclePhase, to: LifecyclePhase) -> AppResult<()> {
        let mut phase = self.phase.lock().unwrap();
        if *phase != from {
            return Err(lifecycle_error!(
                "cannot transition to `{}`: application is `{}`, expected `{}`",
                to.name(),
                phase.name(),
                from.name()
            ));
        }
        *phase = to;
        Ok(())
    }

    pub fn expect_phase(&self, expected: LifecyclePhase) -> AppResult<()> {
        let phase = self.phase.lock().unwrap();
        if *phase != expected {
            return Err(lifecycle_error!(
                "application is `{}`, expected `{}`",
                phase.name(),
                expected.name()
            ));
        }
        Ok(())
    }

    pub fn on_before_request(&self, observer: Observer) -> ObserverId {
        let id = self.next_observer.fetch_add(1, Ordering::Relaxed);
        self.before_request.lock().unwrap().push((id, observer));
        id
    }

    pub fn on_after_request(&self, observer: Observer) -> ObserverId {
        let id = self.next_observer.fetch_add(1, Ordering::Relaxed);
        self.after_request.lock().unwrap().push((id, observer));
        id
    }

    /// Snapshot of the `beforeRequest` observers in registration order.
    pub fn before_request_observers(&self) -> Vec<Observer> {
        self.before_request
            .lock()
            .unwrap()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect()
    }

    /// Snapshot of the `afterRequest` observers in registration order.
    pub fn after_request_observers(&self) -> Vec<Observer> {
        self.after_request
            .lock()
            .unwrap()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect()
    }

    /// Enter the terminal phase. Returns whether the `afterRequest`
    /// notification still has to fire: true exactly once, and only when
    /// the notification did not already fire during a normal `run`
    /// completion. The phase is switched before the caller notifies, so a
    /// re-entrant `end` from an observer is a no-op.
    pub fn begin_end(&self) -> bool {
        let mut phase = self.phase.lock().unwrap();
        match *phase {
            LifecyclePhase::Ended => false,
            LifecyclePhase::AfterRequestFired => {
                *phase = LifecyclePhase::Ended;
                false
            }
            _ => {
                *phase = LifecyclePhase::Ended;
                true
            }
        }
    }
}
