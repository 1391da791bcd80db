//! Periodic status reporter
//!
//! Publishes a JSON snapshot of the live stream set to the status topic at
//! a fixed interval, so operators can see what the service is forwarding
//! without attaching a debugger.

use std::sync::Arc;
use std::time::Duration;

use pvf_bus::Producer;
use pvf_protocol::encode_status;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::StreamConfigManager;

pub struct StatusReporter {
    manager: Arc<StreamConfigManager>,
    producer: Arc<dyn Producer>,
    topic: String,
    period: Duration,
}

impl StatusReporter {
    pub fn new(
        manager: Arc<StreamConfigManager>,
        producer: Arc<dyn Producer>,
        topic: impl Into<String>,
        period: Duration,
    ) -> Self {
        Self {
            manager,
            producer,
            topic: topic.into(),
            period,
        }
    }

    /// Publish snapshots until cancelled
    ///
    /// A failed publish is logged and retried at the next tick; status
    /// reporting never takes the service down.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::debug!(topic = %self.topic, period = ?self.period, "status reporter started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.report().await,
            }
        }

        tracing::debug!(topic = %self.topic, "status reporter stopped");
    }

    async fn report(&self) {
        let snapshot = self.manager.snapshot().await;
        let payload = encode_status(&snapshot);

        if let Err(e) = self.producer.publish(&self.topic, None, &payload).await {
            tracing::warn!(topic = %self.topic, error = %e, "status publish failed");
        } else {
            tracing::trace!(streams = snapshot.stream_count(), "status published");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvf_bus::testing::{RecordingProducer, ScriptedMonitor};
    use pvf_protocol::{decode_status, ConfigCommand, StreamSpec};
    use tokio::time::{sleep, timeout};

    fn spec(channel: &str) -> StreamSpec {
        StreamSpec {
            channel: channel.to_string(),
            provider_type: "pva".to_string(),
            schema: "f142".to_string(),
            topic: "output_topic".to_string(),
            periodic_ms: None,
        }
    }

    #[tokio::test]
    async fn test_reporter_publishes_snapshots() {
        let producer = Arc::new(RecordingProducer::new());
        let monitor = Arc::new(ScriptedMonitor::new());
        let manager = Arc::new(StreamConfigManager::new(
            producer.clone(),
            monitor.clone(),
        ));
        manager
            .apply(ConfigCommand::Add(vec![spec("SIM:Spd1")]))
            .await;

        let reporter = StatusReporter::new(
            manager,
            producer.clone(),
            "status_topic",
            Duration::from_millis(10),
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn(reporter.run(cancel.clone()));

        timeout(Duration::from_secs(2), async {
            while producer.payloads_for("status_topic").is_empty() {
                sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("no status published");

        let payloads = producer.payloads_for("status_topic");
        let snapshot = decode_status(&payloads[0]).unwrap();
        assert_eq!(snapshot.stream_count(), 1);
        assert_eq!(snapshot.streams[0].channel, "SIM:Spd1");
        assert_eq!(snapshot.streams[0].topic, "output_topic");
        assert!(!snapshot.streams[0].connected);
        assert!(snapshot.timestamp_ms > 0);

        cancel.cancel();
        task.await.unwrap();

        let settled = producer.payloads_for("status_topic").len();
        sleep(Duration::from_millis(30)).await;
        assert_eq!(producer.payloads_for("status_topic").len(), settled);
    }
}
