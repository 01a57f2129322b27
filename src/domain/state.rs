// Device state classification
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceState {
    On,
    Off,
}

impl DeviceState {
    pub fn label(self) -> &'static str {
        match self {
            DeviceState::On => "ON",
            DeviceState::Off => "OFF",
        }
    }
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How a reading is compared against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    /// ON when `value > threshold`
    Gt,
    /// ON when `value >= threshold`
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub value: f64,
    pub comparison: Comparison,
}

impl Threshold {
    pub fn new(value: f64, comparison: Comparison) -> Self {
        Self { value, comparison }
    }

    /// Classify a reading. No hysteresis: readings hovering at the boundary
    /// flip state as often as they cross it.
    pub fn classify(&self, reading: f64) -> DeviceState {
        let on = match self.comparison {
            Comparison::Gt => reading > self.value,
            Comparison::Ge => reading >= self.value,
        };

        if on { DeviceState::On } else { DeviceState::Off }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_threshold() {
        let threshold = Threshold::new(1.0, Comparison::Gt);
        assert_eq!(threshold.classify(0.2), DeviceState::Off);
        assert_eq!(threshold.classify(1.0), DeviceState::Off);
        assert_eq!(threshold.classify(1.5), DeviceState::On);
    }

    #[test]
    fn test_inclusive_threshold() {
        let threshold = Threshold::new(1.0, Comparison::Ge);
        assert_eq!(threshold.classify(0.99), DeviceState::Off);
        assert_eq!(threshold.classify(1.0), DeviceState::On);
    }

    #[test]
    fn test_classification_ignores_history() {
        let threshold = Threshold::new(5.0, Comparison::Gt);
        let first: Vec<_> = [6.0, 5.0, 4.0].iter().map(|v| threshold.classify(*v)).collect();
        let again: Vec<_> = [4.0, 6.0, 5.0].iter().map(|v| threshold.classify(*v)).collect();

        assert_eq!(first, vec![DeviceState::On, DeviceState::Off, DeviceState::Off]);
        assert_eq!(again, vec![DeviceState::Off, DeviceState::On, DeviceState::Off]);
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(serde_json::to_string(&DeviceState::On).unwrap(), "\"ON\"");
        assert_eq!(DeviceState::Off.to_string(), "OFF");
        assert_eq!(
            serde_json::from_str::<Comparison>("\"ge\"").unwrap(),
            Comparison::Ge
        );
    }
}
