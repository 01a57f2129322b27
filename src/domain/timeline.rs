// Retained window of state events
use std::collections::VecDeque;

use chrono::TimeDelta;

use super::state::DeviceState;
use super::telemetry::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateEvent {
    pub timestamp: Timestamp,
    pub state: DeviceState,
}

impl StateEvent {
    pub fn new(timestamp: Timestamp, state: DeviceState) -> Self {
        Self { timestamp, state }
    }
}

#[derive(Debug, Clone)]
pub struct TimelineWindow {
    events: VecDeque<StateEvent>,
    retention: Option<TimeDelta>,
    coalesce: bool,
}

impl TimelineWindow {
    /// `retention = None` keeps every event for the lifetime of the window.
    pub fn new(retention: Option<TimeDelta>, coalesce: bool) -> Self {
        Self {
            events: VecDeque::new(),
            retention,
            coalesce,
        }
    }

    /// Append an event, then drop everything at or beyond the horizon.
    ///
    /// Returns the number of pruned events.
    pub fn append(&mut self, event: StateEvent, now: Timestamp) -> usize {
        let repeats_tail = self.events.back().is_some_and(|last| last.state == event.state);
        if !(self.coalesce && repeats_tail) {
            self.events.push_back(event);
        }

        self.prune(now)
    }

    fn prune(&mut self, now: Timestamp) -> usize {
        let Some(retention) = self.retention else {
            return 0;
        };

        // A horizon reaching past the representable range prunes nothing.
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            return 0;
        };
        let before = self.events.len();

        // Records from the processed-state channel may arrive out of order,
        // so stale events are not guaranteed to sit at the head.
        self.events.retain(|e| e.timestamp > cutoff);

        before - self.events.len()
    }

    pub fn events(&self) -> impl Iterator<Item = &StateEvent> {
        self.events.iter()
    }
}
