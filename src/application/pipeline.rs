// State pipeline - parse, classify and aggregate incoming telemetry
use bytes::Bytes;
use chrono::TimeDelta;

use crate::domain::duty_cycle::DutyCycleCounters;
use crate::domain::state::{DeviceState, Threshold};
use crate::domain::telemetry::{
    format_off_start, parse_reading, parse_state_record, PayloadError, Reading, StateRecord,
    Timestamp,
};
use crate::domain::timeline::{StateEvent, TimelineWindow};
use crate::domain::transition::TransitionTracker;
use crate::infrastructure::config::MonitorConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub channel: String,
    pub payload: Bytes,
}

impl InboundMessage {
    pub fn new(channel: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub channel: String,
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayChannels {
    pub processed_state: String,
    pub off_timestamp: String,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub raw_channel: String,
    /// Channel carrying already-classified state records, if consumed.
    pub processed_channel: Option<String>,
    /// Where to republish derived state, if relaying.
    pub relay: Option<RelayChannels>,
    pub threshold: Threshold,
    pub unit: String,
    pub unit_suffix: String,
    pub retention: Option<TimeDelta>,
    pub coalesce: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &MonitorConfig) -> Self {
        let channels = &config.channels;
        Self {
            raw_channel: channels.raw_current.clone(),
            processed_channel: channels
                .subscribe_processed
                .then(|| channels.processed_state.clone()),
            relay: channels.publish_processed.then(|| RelayChannels {
                processed_state: channels.processed_state.clone(),
                off_timestamp: channels.off_timestamp.clone(),
            }),
            threshold: config.classification.threshold(),
            unit: config.classification.unit.clone(),
            unit_suffix: config.classification.suffix().to_string(),
            retention: config.timeline.retention(),
            coalesce: config.timeline.coalesce,
        }
    }

    /// Channels the transport has to subscribe to.
    pub fn inbound_channels(&self) -> Vec<String> {
        std::iter::once(self.raw_channel.clone())
            .chain(self.processed_channel.clone())
            .collect()
    }
}

/// Read-only copy of the pipeline state handed to renderers.
///
/// Every field reflects the same set of processed messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSnapshot {
    pub unit: String,
    pub reading: Option<Reading>,
    pub state: Option<DeviceState>,
    pub duty_cycle: DutyCycleCounters,
    pub timeline: Vec<StateEvent>,
    pub off_since: Option<Timestamp>,
    pub invalid_payloads: u64,
    pub last_warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Accepted {
        state: DeviceState,
        off_started: Option<Timestamp>,
        outbound: Vec<OutboundMessage>,
    },
    Rejected(PayloadError),
    Ignored,
}

enum Route {
    RawCurrent,
    ProcessedState,
}

/// Owns all derived state. Exactly one task drives it.
#[derive(Debug)]
pub struct StatePipeline {
    settings: PipelineSettings,
    counters: DutyCycleCounters,
    tracker: TransitionTracker,
    timeline: TimelineWindow,
    reading: Option<Reading>,
    state: Option<DeviceState>,
    invalid_payloads: u64,
    last_warning: Option<String>,
}

impl StatePipeline {
    pub fn new(settings: PipelineSettings) -> Self {
        let timeline = TimelineWindow::new(settings.retention, settings.coalesce);
        Self {
            settings,
            counters: DutyCycleCounters::new(),
            tracker: TransitionTracker::new(),
            timeline,
            reading: None,
            state: None,
            invalid_payloads: 0,
            last_warning: None,
        }
    }

    fn route(&self, channel: &str) -> Option<Route> {
        if channel == self.settings.raw_channel {
            Some(Route::RawCurrent)
        } else if self.settings.processed_channel.as_deref() == Some(channel) {
            Some(Route::ProcessedState)
        } else {
            None
        }
    }

    pub fn ingest(&mut self, message: &InboundMessage, now: Timestamp) -> IngestOutcome {
        let parsed = match self.route(&message.channel) {
            Some(Route::RawCurrent) => self.parse_raw(&message.payload, now),
            Some(Route::ProcessedState) => parse_state_record(&message.payload),
            None => return IngestOutcome::Ignored,
        };

        match parsed {
            Ok((timestamp, state)) => self.apply(timestamp, state, now),
            Err(err) => {
                self.invalid_payloads += 1;
                self.last_warning = Some(err.to_string());
                IngestOutcome::Rejected(err)
            }
        }
    }

    fn parse_raw(
        &mut self,
        payload: &[u8],
        now: Timestamp,
    ) -> Result<(Timestamp, DeviceState), PayloadError> {
        let value = parse_reading(payload, &self.settings.unit_suffix)?;
        self.reading = Some(Reading::new(value, self.settings.unit.clone(), now));
        Ok((now, self.settings.threshold.classify(value)))
    }

    fn apply(&mut self, timestamp: Timestamp, state: DeviceState, now: Timestamp) -> IngestOutcome {
        // The warning describes the latest message only; the count keeps history.
        self.last_warning = None;
        self.state = Some(state);
        self.counters.record(state);
        let off_started = self.tracker.observe(state, timestamp);
        let pruned = self.timeline.append(StateEvent::new(timestamp, state), now);
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned stale timeline events");
        }

        let mut outbound = Vec::new();
        if let Some(relay) = &self.settings.relay {
            if let Some(since) = off_started {
                outbound.push(OutboundMessage {
                    channel: relay.off_timestamp.clone(),
                    payload: format_off_start(since),
                });
            }
            // Serializing a StateRecord cannot fail.
            if let Ok(record) = serde_json::to_string(&StateRecord::new(timestamp, state)) {
                outbound.push(OutboundMessage {
                    channel: relay.processed_state.clone(),
                    payload: record,
                });
            }
        }

        IngestOutcome::Accepted {
            state,
            off_started,
            outbound,
        }
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            unit: self.settings.unit.clone(),
            reading: self.reading.clone(),
            state: self.state,
            duty_cycle: self.counters,
            timeline: self.timeline.events().copied().collect(),
            off_since: self.tracker.off_since(),
            invalid_payloads: self.invalid_payloads,
            last_warning: self.last_warning.clone(),
        }
    }
}
