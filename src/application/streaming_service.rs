// Streaming dashboard service - Push dashboard frames on a refresh tick
use crate::application::dashboard_service::DashboardService;
use crate::domain::dashboard::Dashboard;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

const FRAME_BUFFER: usize = 4;

#[derive(Clone)]
pub struct StreamingDashboardService {
    dashboard: DashboardService,
    refresh_interval: Duration,
}

impl StreamingDashboardService {
    pub fn new(dashboard: DashboardService, refresh_interval: Duration) -> Self {
        Self {
            dashboard,
            refresh_interval,
        }
    }

    /// Emit one frame per refresh tick, only when the snapshot moved since
    /// the previous frame. Intermediate snapshots are skipped, never replayed.
    pub fn stream_dashboard(&self) -> mpsc::Receiver<Dashboard> {
        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        let dashboard = self.dashboard.clone();
        let mut snapshots = dashboard.subscribe();
        let refresh_interval = self.refresh_interval;

        // First frame goes out immediately.
        snapshots.mark_changed();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(refresh_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                if tx.is_closed() {
                    tracing::debug!("Dashboard stream client went away");
                    break;
                }

                match snapshots.has_changed() {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(_) => {
                        tracing::debug!("Snapshot source closed, ending dashboard stream");
                        break;
                    }
                }

                let snapshot = snapshots.borrow_and_update().clone();
                if tx.send(dashboard.build(&snapshot)).await.is_err() {
                    break;
                }
            }
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pipeline::PipelineSnapshot;
    use crate::domain::dashboard::DutyCycleChart;
    use crate::domain::duty_cycle::DutyCycleCounters;
    use crate::domain::state::DeviceState;
    use std::sync::Arc;
    use tokio::sync::watch;
    use tokio::time::timeout;

    fn counters(on: usize) -> DutyCycleCounters {
        let mut counters = DutyCycleCounters::new();
        (0..on).for_each(|_| counters.record(DeviceState::On));
        counters
    }

    #[tokio::test]
    async fn test_streams_latest_snapshot_only() {
        let (tx, rx) = watch::channel(Arc::new(PipelineSnapshot::default()));
        let dashboard = DashboardService::new(rx, "Device".to_string(), 10.0);
        let streaming = StreamingDashboardService::new(dashboard, Duration::from_millis(20));

        let mut frames = streaming.stream_dashboard();
        let first = frames.recv().await.unwrap();
        assert_eq!(first.duty_cycle, DutyCycleChart::Waiting);

        // Nothing changed: no frame on the next ticks.
        assert!(timeout(Duration::from_millis(70), frames.recv()).await.is_err());

        // Several updates between ticks collapse into one frame.
        for on in 1..=3 {
            tx.send_replace(Arc::new(PipelineSnapshot {
                duty_cycle: counters(on),
                ..Default::default()
            }));
        }
        let next = timeout(Duration::from_secs(1), frames.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(next.duty_cycle, DutyCycleChart::Ready { on: 3, .. }));
    }

    #[tokio::test]
    async fn test_stream_ends_when_source_closes() {
        let (tx, rx) = watch::channel(Arc::new(PipelineSnapshot::default()));
        let dashboard = DashboardService::new(rx, "Device".to_string(), 10.0);
        let streaming = StreamingDashboardService::new(dashboard, Duration::from_millis(10));

        let mut frames = streaming.stream_dashboard();
        frames.recv().await.unwrap();
        drop(tx);

        let end = timeout(Duration::from_secs(1), frames.recv()).await.unwrap();
        assert!(end.is_none());
    }
}
