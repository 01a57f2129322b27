// Lifetime ON/OFF sample counters
use super::state::DeviceState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DutyCycleCounters {
    on: u64,
    off: u64,
}

impl DutyCycleCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, state: DeviceState) {
        match state {
            DeviceState::On => self.on += 1,
            DeviceState::Off => self.off += 1,
        }
    }

    pub fn on(&self) -> u64 {
        self.on
    }

    pub fn off(&self) -> u64 {
        self.off
    }

    pub fn total(&self) -> u64 {
        self.on + self.off
    }

    /// Share of samples spent ON and OFF, or `None` before the first sample.
    pub fn proportions(&self) -> Option<(f64, f64)> {
        let total = self.total();
        if total == 0 {
            return None;
        }

        let on = self.on as f64 / total as f64;
        Some((on, 1.0 - on))
    }
}
