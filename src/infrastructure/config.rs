use std::net::SocketAddr;
use std::time::Duration;

use chrono::TimeDelta;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::state::{Comparison, Threshold};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MonitorConfig {
    pub broker: BrokerSettings,
    pub channels: ChannelSettings,
    pub classification: ClassificationSettings,
    pub timeline: TimelineSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
    pub queue_capacity: usize,
    pub reconnect_delay_ms: u64,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: "broker.hivemq.com".to_string(),
            port: 1883,
            client_id: "device-state-monitor".to_string(),
            keep_alive_secs: 60,
            queue_capacity: 64,
            reconnect_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChannelSettings {
    pub raw_current: String,
    pub processed_state: String,
    pub off_timestamp: String,
    /// Consume state records from `processed_state` (viewer deployments).
    pub subscribe_processed: bool,
    /// Publish state records and OFF-start times (relay deployments).
    pub publish_processed: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            raw_current: "home/arduino/current".to_string(),
            processed_state: "processed/home/arduino/state".to_string(),
            off_timestamp: "processed/home/arduino/timestamp".to_string(),
            subscribe_processed: false,
            publish_processed: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassificationSettings {
    pub threshold: f64,
    pub comparison: Comparison,
    pub unit: String,
    /// Suffix stripped from raw payloads; defaults to `unit`.
    pub strip_suffix: Option<String>,
}

impl Default for ClassificationSettings {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            comparison: Comparison::Gt,
            unit: "A".to_string(),
            strip_suffix: None,
        }
    }
}

impl ClassificationSettings {
    pub fn threshold(&self) -> Threshold {
        Threshold::new(self.threshold, self.comparison)
    }

    pub fn suffix(&self) -> &str {
        self.strip_suffix.as_deref().unwrap_or(&self.unit)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimelineSettings {
    /// 0 keeps events forever.
    pub retention_secs: u64,
    pub coalesce: bool,
    pub annotation_offset: f64,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            retention_secs: 3 * 60 * 60,
            coalesce: false,
            annotation_offset: crate::domain::annotation::DEFAULT_ANNOTATION_OFFSET,
        }
    }
}

impl TimelineSettings {
    pub fn retention(&self) -> Option<TimeDelta> {
        if self.retention_secs == 0 {
            return None;
        }
        i64::try_from(self.retention_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: SocketAddr,
    pub refresh_interval_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            refresh_interval_ms: 1000,
        }
    }
}

impl ServerSettings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("classification threshold must be a finite number, got {0}")]
    NonFiniteThreshold(f64),
    #[error("broker queue capacity must be greater than zero")]
    ZeroQueueCapacity,
    #[error("refresh interval must be greater than zero")]
    ZeroRefreshInterval,
    #[error("annotation offset must be a finite number, got {0}")]
    NonFiniteOffset(f64),
    #[error("timeline retention of {0} seconds is out of range")]
    RetentionOutOfRange(u64),
    #[error("cannot both subscribe to and publish on {0:?}")]
    RelayLoop(String),
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.classification.threshold.is_finite() {
            return Err(ConfigValidationError::NonFiniteThreshold(
                self.classification.threshold,
            ));
        }
        if self.broker.queue_capacity == 0 {
            return Err(ConfigValidationError::ZeroQueueCapacity);
        }
        if self.server.refresh_interval_ms == 0 {
            return Err(ConfigValidationError::ZeroRefreshInterval);
        }
        if !self.timeline.annotation_offset.is_finite() {
            return Err(ConfigValidationError::NonFiniteOffset(
                self.timeline.annotation_offset,
            ));
        }
        if self.timeline.retention_secs != 0 && self.timeline.retention().is_none() {
            return Err(ConfigValidationError::RetentionOutOfRange(
                self.timeline.retention_secs,
            ));
        }
        if self.channels.subscribe_processed && self.channels.publish_processed {
            return Err(ConfigValidationError::RelayLoop(
                self.channels.processed_state.clone(),
            ));
        }
        Ok(())
    }
}

/// Load `config/monitor.*` (optional) overridden by `MONITOR_*` environment
/// variables, e.g. `MONITOR_BROKER__HOST=localhost`.
pub fn load_monitor_config() -> anyhow::Result<MonitorConfig> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name("config/monitor").required(false))
        .add_source(
            config::Environment::with_prefix("MONITOR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    build_monitor_config(builder)
}

fn build_monitor_config(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> anyhow::Result<MonitorConfig> {
    let settings: MonitorConfig = builder.build()?.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> anyhow::Result<MonitorConfig> {
        build_monitor_config(
            config::Config::builder()
                .add_source(config::File::from_str(toml, config::FileFormat::Toml)),
        )
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("").unwrap();

        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.classification.threshold(), Threshold::new(1.0, Comparison::Gt));
        assert_eq!(config.classification.suffix(), "A");
        assert_eq!(config.timeline.retention(), Some(TimeDelta::hours(3)));
        assert_eq!(config.server.refresh_interval(), Duration::from_secs(1));
        assert!(!config.channels.publish_processed);
    }

    #[test]
    fn test_milliamp_variant() {
        let config = from_toml(
            r#"
            [classification]
            threshold = 5.0
            comparison = "ge"
            unit = "mA"

            [timeline]
            retention_secs = 0
            coalesce = true
            "#,
        )
        .unwrap();

        assert_eq!(config.classification.threshold(), Threshold::new(5.0, Comparison::Ge));
        assert_eq!(config.classification.suffix(), "mA");
        assert_eq!(config.timeline.retention(), None);
        assert!(config.timeline.coalesce);
    }

    #[test]
    fn test_rejects_relay_loop() {
        let err = from_toml(
            r#"
            [channels]
            subscribe_processed = true
            publish_processed = true
            "#,
        )
        .unwrap_err();

        assert_eq!(
            err.downcast_ref::<ConfigValidationError>(),
            Some(&ConfigValidationError::RelayLoop(
                "processed/home/arduino/state".to_string()
            ))
        );
    }

    #[test]
    fn test_rejects_zero_intervals() {
        let mut config = MonitorConfig::default();
        config.server.refresh_interval_ms = 0;
        assert_eq!(config.validate(), Err(ConfigValidationError::ZeroRefreshInterval));

        let mut config = MonitorConfig::default();
        config.broker.queue_capacity = 0;
        assert_eq!(config.validate(), Err(ConfigValidationError::ZeroQueueCapacity));
    }

    #[test]
    fn test_rejects_unrepresentable_retention() {
        let mut config = MonitorConfig::default();
        config.timeline.retention_secs = u64::MAX;
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::RetentionOutOfRange(u64::MAX))
        );

        config.timeline.retention_secs = i64::MAX as u64;
        assert!(config.validate().is_err());

        // Representable, if absurd: accepted, and the window copes with it.
        config.timeline.retention_secs = 100_000_000_000_000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_comparison() {
        assert!(from_toml("[classification]\ncomparison = \"lt\"\n").is_err());
    }
}
