//! Synchronization Event Bus - page-scoped publish/subscribe between widgets.
//!
//! One bus is created per page and handed to whoever needs it. There is no
//! global instance.
//!
//! # Delivery
//!
//! ```text
//! emit(event) ──► snapshot handlers for event.name() ──► call each in registration order
//!                                                      (errors and panics are contained)
//! ```
//!
//! Handlers added or removed while an emission is running take effect on the
//! next emission.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, error, warn};

use crate::error::ViewError;
use crate::model::DisplayMode;

/// Events exchanged between page widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    /// The user activated the chart point at this filtered-sequence index
    ChartPointActivated { index: usize },

    /// The user picked a different chart display mode
    ChartModeSelected { mode: DisplayMode },
}

impl BusEvent {
    pub fn name(&self) -> EventName {
        match self {
            BusEvent::ChartPointActivated { .. } => EventName::ChartPointActivated,
            BusEvent::ChartModeSelected { .. } => EventName::ChartModeSelected,
        }
    }
}

/// Channel key. Each name has its own ordered handler list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    ChartPointActivated,
    ChartModeSelected,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::ChartPointActivated => "chart:pointClicked",
            EventName::ChartModeSelected => "chart:modeSelected",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Handler = Arc<dyn Fn(&BusEvent) -> Result<(), ViewError> + Send + Sync>;

#[derive(Default)]
struct BusInner {
    handlers: HashMap<EventName, Vec<(u64, Handler)>>,
    next_id: u64,
}

/// Outcome of a single `emit`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitReport {
    /// Handlers that completed successfully
    pub delivered: usize,

    /// Handlers that returned an error or panicked
    pub failed: usize,
}

/// Page-lifetime event bus. Clones share the same handler table.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a handler; it stays registered until the returned guard is
    /// dropped or `unsubscribe`d.
    pub fn on<F>(&self, name: EventName, handler: F) -> Subscription
    where
        F: Fn(&BusEvent) -> Result<(), ViewError> + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.handlers.entry(name).or_default().push((id, Arc::new(handler)));
        debug!("subscribed #{} to {}", id, name);
        Subscription {
            bus: Arc::downgrade(&self.inner),
            name,
            id,
            active: true,
        }
    }

    /// Delivers `event` to every handler registered for its name.
    pub fn emit(&self, event: BusEvent) -> EmitReport {
        let name = event.name();
        let handlers: Vec<Handler> = self
            .lock()
            .handlers
            .get(&name)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        let mut report = EmitReport::default();
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    warn!("{} handler failed: {}", name, e);
                    report.failed += 1;
                }
                Err(_) => {
                    error!("{} handler panicked", name);
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Number of handlers currently registered for `name`.
    pub fn handler_count(&self, name: EventName) -> usize {
        self.lock().handlers.get(&name).map_or(0, Vec::len)
    }

    /// Drops every registration (page teardown).
    pub fn clear(&self) {
        let drained = std::mem::take(&mut self.lock().handlers);
        debug!("bus cleared ({} channels)", drained.len());
    }
}

/// Registration guard returned by `EventBus::on`.
pub struct Subscription {
    bus: Weak<Mutex<BusInner>>,
    name: EventName,
    id: u64,
    active: bool,
}

impl Subscription {
    pub fn name(&self) -> EventName {
        self.name
    }

    /// Removes the handler now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        let Some(inner) = self.bus.upgrade() else {
            return;
        };
        // The handler is dropped after the lock is released; it may own guards.
        let removed = {
            let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.handlers.get_mut(&self.name).and_then(|list| {
                let pos = list.iter().position(|(id, _)| *id == self.id)?;
                Some(list.remove(pos))
            })
        };
        if removed.is_some() {
            debug!("unsubscribed #{} from {}", self.id, self.name);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
