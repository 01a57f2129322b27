// Telemetry data domain models
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::DeviceState;

/// Wall-clock instant as reported on the wire. Times are local and carry no offset.
pub type Timestamp = NaiveDateTime;

/// Format of the `time` field of a processed-state record.
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of the OFF-start timestamp published on its own channel.
pub const OFF_START_FORMAT: &str = "%H:%M:%S";

pub fn now() -> Timestamp {
    Local::now().naive_local()
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayloadError {
    #[error("invalid payload {payload:?}: {reason}")]
    InvalidPayload { payload: String, reason: String },
}

impl PayloadError {
    fn invalid(payload: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            payload: payload.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub value: f64,
    pub unit: String,
    pub received_at: Timestamp,
}

impl Reading {
    pub fn new(value: f64, unit: String, received_at: Timestamp) -> Self {
        Self {
            value,
            unit,
            received_at,
        }
    }
}

/// Parse a raw current payload such as `"1.25"` or `"1.25 A"`.
///
/// The unit suffix is optional and stripped before parsing. Non-finite
/// values are rejected so they can never reach the classifier.
pub fn parse_reading(payload: &[u8], unit_suffix: &str) -> Result<f64, PayloadError> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| PayloadError::invalid(String::from_utf8_lossy(payload), "not valid UTF-8"))?;

    let trimmed = text.trim();
    let suffix = unit_suffix.trim();
    let number = if suffix.is_empty() {
        trimmed
    } else {
        trimmed.strip_suffix(suffix).unwrap_or(trimmed).trim_end()
    };

    let value: f64 = number
        .parse()
        .map_err(|_| PayloadError::invalid(text, "not a number"))?;

    if !value.is_finite() {
        return Err(PayloadError::invalid(text, "not a finite number"));
    }

    Ok(value)
}

/// A state record as exchanged on the processed-state channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub time: String,
    pub state: DeviceState,
}

impl StateRecord {
    pub fn new(time: Timestamp, state: DeviceState) -> Self {
        Self {
            time: time.format(RECORD_TIME_FORMAT).to_string(),
            state,
        }
    }
}

/// Parse a processed-state record into its timestamp and state.
pub fn parse_state_record(payload: &[u8]) -> Result<(Timestamp, DeviceState), PayloadError> {
    let record: StateRecord = serde_json::from_slice(payload).map_err(|e| {
        PayloadError::invalid(String::from_utf8_lossy(payload), e.to_string())
    })?;

    let time = NaiveDateTime::parse_from_str(&record.time, RECORD_TIME_FORMAT).map_err(|e| {
        PayloadError::invalid(String::from_utf8_lossy(payload), format!("bad time: {}", e))
    })?;

    Ok((time, record.state))
}

pub fn format_off_start(since: Timestamp) -> String {
    since.format(OFF_START_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_parse_plain_number() {
        assert_eq!(parse_reading(b"1.5", "A").unwrap(), 1.5);
        assert_eq!(parse_reading(b" 0.2\n", "A").unwrap(), 0.2);
    }

    #[test]
    fn test_parse_strips_unit_suffix() {
        assert_eq!(parse_reading(b"1.6 A", "A").unwrap(), 1.6);
        assert_eq!(parse_reading(b"12mA", "mA").unwrap(), 12.0);
        assert!(parse_reading(b"3 A", "").is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_reading(b"bad", "A").unwrap_err();
        assert!(matches!(err, PayloadError::InvalidPayload { ref payload, .. } if payload == "bad"));

        assert!(parse_reading(b"", "A").is_err());
        assert!(parse_reading(b"A", "A").is_err());
        assert!(parse_reading(&[0xff, 0xfe], "A").is_err());
    }

    #[test]
    fn test_parse_rejects_non_finite() {
        assert!(parse_reading(b"NaN", "A").is_err());
        assert!(parse_reading(b"inf", "A").is_err());
    }

    #[test]
    fn test_state_record_wire_format() {
        let record = StateRecord::new(at(14, 5, 9), DeviceState::Off);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"time":"2024-03-09 14:05:09","state":"OFF"}"#);

        let (time, state) = parse_state_record(json.as_bytes()).unwrap();
        assert_eq!(time, at(14, 5, 9));
        assert_eq!(state, DeviceState::Off);
    }

    #[test]
    fn test_state_record_rejects_bad_input() {
        assert!(parse_state_record(b"bad").is_err());
        assert!(parse_state_record(br#"{"time":"yesterday","state":"ON"}"#).is_err());
        assert!(parse_state_record(br#"{"time":"2024-03-09 14:05:09","state":"DIM"}"#).is_err());
    }

    #[test]
    fn test_format_off_start() {
        assert_eq!(format_off_start(at(7, 3, 0)), "07:03:00");
    }
}
