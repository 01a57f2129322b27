// Dashboard service - Use case for building renderer views from snapshots
use crate::application::pipeline::PipelineSnapshot;
use crate::domain::annotation::place_annotations;
use crate::domain::dashboard::{
    Dashboard, DutyCycleChart, ReadingTile, TimelineAnnotation, TimelineChart, TimelineSegment,
    ANNOTATION_TIME_FORMAT,
};
use crate::domain::telemetry::{format_off_start, RECORD_TIME_FORMAT};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct DashboardService {
    snapshots: watch::Receiver<Arc<PipelineSnapshot>>,
    title: String,
    annotation_offset: f64,
}

impl DashboardService {
    pub fn new(
        snapshots: watch::Receiver<Arc<PipelineSnapshot>>,
        title: String,
        annotation_offset: f64,
    ) -> Self {
        Self {
            snapshots,
            title,
            annotation_offset,
        }
    }

    /// Latest published snapshot; never blocks the ingestion task.
    pub fn latest(&self) -> Arc<PipelineSnapshot> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PipelineSnapshot>> {
        self.snapshots.clone()
    }

    pub fn reading(&self) -> ReadingTile {
        reading_tile(&self.latest())
    }

    pub fn duty_cycle(&self) -> DutyCycleChart {
        duty_cycle_chart(&self.latest())
    }

    pub fn timeline(&self) -> TimelineChart {
        timeline_chart(&self.latest(), self.annotation_offset)
    }

    pub fn dashboard(&self) -> Dashboard {
        self.build(&self.latest())
    }

    pub fn build(&self, snapshot: &PipelineSnapshot) -> Dashboard {
        Dashboard {
            title: self.title.clone(),
            reading: reading_tile(snapshot),
            duty_cycle: duty_cycle_chart(snapshot),
            timeline: timeline_chart(snapshot, self.annotation_offset),
            invalid_payloads: snapshot.invalid_payloads,
            warning: snapshot.last_warning.clone(),
        }
    }
}

fn reading_tile(snapshot: &PipelineSnapshot) -> ReadingTile {
    ReadingTile {
        value: snapshot.reading.as_ref().map(|r| r.value),
        unit: snapshot.unit.clone(),
        state: snapshot.state,
        received_at: snapshot
            .reading
            .as_ref()
            .map(|r| r.received_at.format(RECORD_TIME_FORMAT).to_string()),
        off_since: snapshot.off_since.map(format_off_start),
    }
}

fn duty_cycle_chart(snapshot: &PipelineSnapshot) -> DutyCycleChart {
    let counters = snapshot.duty_cycle;
    match counters.proportions() {
        Some((on_ratio, off_ratio)) => DutyCycleChart::Ready {
            on: counters.on(),
            off: counters.off(),
            on_ratio,
            off_ratio,
        },
        None => DutyCycleChart::Waiting,
    }
}

fn timeline_chart(snapshot: &PipelineSnapshot, offset: f64) -> TimelineChart {
    if snapshot.timeline.is_empty() {
        return TimelineChart::Waiting;
    }

    let segments: Vec<TimelineSegment> = snapshot
        .timeline
        .iter()
        .enumerate()
        .map(|(position, event)| TimelineSegment {
            position,
            time: event.timestamp.format(RECORD_TIME_FORMAT).to_string(),
            state: event.state,
        })
        .collect();

    let annotations = place_annotations(
        snapshot.timeline.iter().map(|e| e.state).enumerate(),
        offset,
    )
    .into_iter()
    .map(|placement| TimelineAnnotation {
        position: placement.position,
        side: placement.side,
        offset: placement.offset,
        label: snapshot.timeline[placement.position]
            .timestamp
            .format(ANNOTATION_TIME_FORMAT)
            .to_string(),
    })
    .collect();

    TimelineChart::Ready {
        segments,
        annotations,
    }
}
