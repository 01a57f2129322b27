// Dashboard view models handed to the renderer
use serde::Serialize;

use super::annotation::Side;
use super::state::DeviceState;

/// Label format used for timeline annotations, e.g. `Mar 09, 2024 14:05:09`.
pub const ANNOTATION_TIME_FORMAT: &str = "%b %d, %Y %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingTile {
    pub value: Option<f64>,
    pub unit: String,
    pub state: Option<DeviceState>,
    pub received_at: Option<String>,
    pub off_since: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DutyCycleChart {
    Waiting,
    Ready {
        on: u64,
        off: u64,
        on_ratio: f64,
        off_ratio: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSegment {
    pub position: usize,
    pub time: String,
    pub state: DeviceState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineAnnotation {
    pub position: usize,
    pub side: Side,
    pub offset: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TimelineChart {
    Waiting,
    Ready {
        segments: Vec<TimelineSegment>,
        annotations: Vec<TimelineAnnotation>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub title: String,
    pub reading: ReadingTile,
    pub duty_cycle: DutyCycleChart,
    pub timeline: TimelineChart,
    pub invalid_payloads: u64,
    pub warning: Option<String>,
}
