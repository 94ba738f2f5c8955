// ─────────────────────────────────────────────────────────────────────
// OpenVinayaka — Intervention Observers
// ─────────────────────────────────────────────────────────────────────
//! Observability collaborators for the dispatcher.
//!
//! The kernel never prints. Every operator invocation made by the
//! dispatcher is reported as an `InterventionEvent`; what happens to it
//! (log line, trace buffer, Python callback) is the observer's concern.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use vinayaka_types::{ArchitectureVariant, InterventionConfig, Operator, Outcome};

/// One operator invocation within one inference step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterventionEvent {
    pub variant: ArchitectureVariant,
    pub operator: Operator,
    pub outcome: Outcome,
}

impl std::fmt::Display for InterventionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.variant, self.operator, self.outcome)
    }
}

/// Receives intervention events. Must tolerate calls from several
/// engines on different threads.
pub trait InterventionObserver: Send + Sync {
    fn on_event(&self, event: &InterventionEvent);
}

/// Forwards events to the `log` facade: applied interventions at
/// debug, skips at trace.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl InterventionObserver for LogObserver {
    fn on_event(&self, event: &InterventionEvent) {
        if event.outcome.is_applied() {
            log::debug!("{event}");
        } else {
            log::trace!("{event}");
        }
    }
}

/// Bounded in-memory event history.
///
/// Thread-safe: the buffer is guarded by a `parking_lot::Mutex`.
pub struct TraceObserver {
    capacity: usize,
    events: Mutex<VecDeque<InterventionEvent>>,
}

impl TraceObserver {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn from_config(config: &InterventionConfig) -> Self {
        Self::new(config.trace_capacity)
    }

    /// Snapshot, oldest first.
    pub fn events(&self) -> Vec<InterventionEvent> {
        self.events.lock().iter().copied().collect()
    }

    /// Operators in the order they were invoked.
    pub fn operators(&self) -> Vec<Operator> {
        self.events.lock().iter().map(|e| e.operator).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl InterventionObserver for TraceObserver {
    fn on_event(&self, event: &InterventionEvent) {
        let mut events = self.events.lock();
        events.push_back(*event);
        if events.len() > self.capacity {
            events.pop_front();
        }
    }
}
