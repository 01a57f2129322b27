// Ingestion service - Single writer driving the state pipeline
use crate::application::pipeline::{IngestOutcome, InboundMessage, PipelineSnapshot, StatePipeline};
use crate::application::state_publisher::StatePublisher;
use crate::domain::telemetry::{self, Timestamp};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

pub struct IngestionService {
    pipeline: StatePipeline,
    publisher: Arc<dyn StatePublisher>,
    snapshots: watch::Sender<Arc<PipelineSnapshot>>,
}

impl IngestionService {
    pub fn new(
        pipeline: StatePipeline,
        publisher: Arc<dyn StatePublisher>,
    ) -> (Self, watch::Receiver<Arc<PipelineSnapshot>>) {
        let (snapshots, rx) = watch::channel(Arc::new(pipeline.snapshot()));
        (
            Self {
                pipeline,
                publisher,
                snapshots,
            },
            rx,
        )
    }

    /// Process inbound messages in arrival order until the transport side
    /// of the queue is dropped.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<InboundMessage>) {
        while let Some(message) = inbound.recv().await {
            self.handle(message, telemetry::now()).await;
        }
        tracing::info!("Inbound queue closed, ingestion stopped");
    }

    async fn handle(&mut self, message: InboundMessage, now: Timestamp) {
        let outbound = match self.pipeline.ingest(&message, now) {
            IngestOutcome::Accepted {
                state,
                off_started,
                outbound,
            } => {
                tracing::debug!(channel = %message.channel, %state, "Classified message");
                if let Some(since) = off_started {
                    tracing::info!(since = %since, "Device switched OFF");
                }
                outbound
            }
            IngestOutcome::Rejected(err) => {
                tracing::warn!(channel = %message.channel, "Dropping message: {}", err);
                Vec::new()
            }
            IngestOutcome::Ignored => {
                tracing::debug!(channel = %message.channel, "Ignoring message on unrouted channel");
                return;
            }
        };

        // Renderers see the new state before the relay round-trips to the broker.
        self.snapshots.send_replace(Arc::new(self.pipeline.snapshot()));

        for message in outbound {
            if let Err(e) = self.publisher.publish(&message.channel, message.payload).await {
                tracing::error!(channel = %message.channel, "Publish failed: {:#}", e);
            }
        }
    }
}
