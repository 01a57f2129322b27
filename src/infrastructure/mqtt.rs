// MQTT transport - Bridges broker messages into the ingestion queue
use crate::application::pipeline::InboundMessage;
use crate::application::state_publisher::StatePublisher;
use crate::infrastructure::config::BrokerSettings;
use anyhow::Context;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;

/// Capacity of rumqttc's internal request channel.
const REQUEST_CAPACITY: usize = 20;

pub struct MqttBridge {
    client: AsyncClient,
    eventloop: EventLoop,
    channels: Vec<String>,
    reconnect_delay: Duration,
}

#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

pub fn connect(settings: &BrokerSettings, channels: Vec<String>) -> (MqttBridge, MqttPublisher) {
    let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
    options.set_keep_alive(Duration::from_secs(settings.keep_alive_secs));

    let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

    let bridge = MqttBridge {
        client: client.clone(),
        eventloop,
        channels,
        reconnect_delay: Duration::from_millis(settings.reconnect_delay_ms),
    };

    (bridge, MqttPublisher { client })
}

impl MqttBridge {
    /// Poll the broker connection forever, forwarding publishes to `inbound`.
    ///
    /// Connection errors are retried after the reconnect delay. Returns once
    /// the ingestion side of the queue is gone.
    pub async fn run(mut self, inbound: mpsc::Sender<InboundMessage>) {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = InboundMessage::new(publish.topic, publish.payload);
                    // Blocks the event loop while the queue is full rather than dropping.
                    if inbound.send(message).await.is_err() {
                        tracing::info!("Ingestion queue closed, stopping MQTT bridge");
                        return;
                    }
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!("MQTT connected");
                    // Subscriptions may be lost with the session, so always renew them.
                    if let Err(e) = subscribe(&self.client, &self.channels) {
                        tracing::error!("{:#}", e);
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    tracing::warn!("MQTT disconnected");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("MQTT connection error: {}", e);
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }
}

// The poll loop is the only consumer of the request queue, so this must not
// wait on it.
fn subscribe(client: &AsyncClient, channels: &[String]) -> anyhow::Result<()> {
    for channel in channels {
        client
            .try_subscribe(channel.as_str(), QoS::AtLeastOnce)
            .with_context(|| format!("Failed to subscribe to {}", channel))?;
        tracing::info!(channel = %channel, "Subscribed");
    }
    Ok(())
}

#[async_trait]
impl StatePublisher for MqttPublisher {
    /// Enqueue without waiting. The request queue is drained only by the
    /// bridge's poll loop, which may itself be waiting on ingestion, so a full
    /// queue is reported as an error instead of awaited.
    async fn publish(&self, channel: &str, payload: String) -> anyhow::Result<()> {
        self.client
            .try_publish(channel, QoS::AtLeastOnce, false, payload.into_bytes())
            .with_context(|| format!("Failed to publish to {}", channel))?;
        tracing::debug!(channel = %channel, "Published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publisher_queues_without_connection() {
        let (bridge, publisher) = connect(&BrokerSettings::default(), vec!["current".to_string()]);
        assert_eq!(bridge.channels, vec!["current"]);
        assert_eq!(bridge.reconnect_delay, Duration::from_secs(2));

        publisher
            .publish("processed/state", "{}".to_string())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_requests_fail_fast_when_queue_is_full() {
        let (bridge, publisher) = connect(&BrokerSettings::default(), vec!["current".to_string()]);

        for _ in 0..REQUEST_CAPACITY {
            publisher
                .publish("processed/state", "{}".to_string())
                .await
                .unwrap();
        }

        // Nothing polls the event loop here, so awaiting would hang forever.
        let err = publisher
            .publish("processed/state", "{}".to_string())
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("processed/state"));
        assert!(subscribe(&bridge.client, &bridge.channels).is_err());
    }

    #[test]
    fn test_bridge_future_is_send() {
        fn assert_send<T: Send>(_: &T) {}

        let (bridge, _publisher) = connect(&BrokerSettings::default(), vec!["current".to_string()]);
        let (tx, _rx) = mpsc::channel(1);
        let run = bridge.run(tx);
        assert_send(&run);
    }
}
