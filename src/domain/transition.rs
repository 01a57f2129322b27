// OFF-episode tracking
use super::state::DeviceState;
use super::telemetry::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tracking {
    Idle,
    Since(Timestamp),
}

/// Remembers when the current OFF episode began.
///
/// The start is reported exactly once per episode: on the first OFF after an
/// ON, or on the very first reading if the device starts out OFF.
#[derive(Debug, Clone)]
pub struct TransitionTracker {
    tracking: Tracking,
}

impl TransitionTracker {
    pub fn new() -> Self {
        Self {
            tracking: Tracking::Idle,
        }
    }

    /// Feed the next classified state. Returns the OFF-start instant when a
    /// new OFF episode begins, `None` otherwise.
    pub fn observe(&mut self, state: DeviceState, now: Timestamp) -> Option<Timestamp> {
        match (self.tracking, state) {
            (Tracking::Idle, DeviceState::Off) => {
                self.tracking = Tracking::Since(now);
                Some(now)
            }
            (Tracking::Since(_), DeviceState::Off) => None,
            (Tracking::Since(_), DeviceState::On) => {
                self.tracking = Tracking::Idle;
                None
            }
            (Tracking::Idle, DeviceState::On) => None,
        }
    }

    pub fn off_since(&self) -> Option<Timestamp> {
        match self.tracking {
            Tracking::Idle => None,
            Tracking::Since(since) => Some(since),
        }
    }
}

impl Default for TransitionTracker {
    fn default() -> Self {
        Self::new()
    }
}
