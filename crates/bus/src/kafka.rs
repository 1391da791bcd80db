//! Kafka implementations of the bus capabilities
//!
//! Built on rdkafka (librdkafka bindings). The producer is internally
//! thread-safe and shared by every update handler plus the status reporter;
//! the command source wraps a `StreamConsumer` subscribed to the
//! reconfiguration topic.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;

use crate::{BusError, Producer, Result};

/// Kafka-backed [`Producer`]
pub struct KafkaProducer {
    producer: FutureProducer,
    delivery_timeout: Duration,
}

impl KafkaProducer {
    /// Connect to the given bootstrap servers
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the client cannot be constructed.
    pub fn new(bootstrap: &str, delivery_timeout: Duration) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap)
            .set("message.timeout.ms", delivery_timeout.as_millis().to_string())
            .create()
            .map_err(|e| BusError::Transport(e.to_string()))?;

        Ok(Self {
            producer,
            delivery_timeout,
        })
    }
}

#[async_trait]
impl Producer for KafkaProducer {
    async fn publish(&self, topic: &str, key: Option<&[u8]>, payload: &[u8]) -> Result<()> {
        let record = FutureRecord {
            topic,
            partition: None,
            payload: Some(payload),
            key,
            timestamp: None,
            headers: None,
        };

        self.producer
            .send(record, Timeout::After(self.delivery_timeout))
            .await
            .map_err(|(e, _)| BusError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Consumes raw reconfiguration-command payloads from the command topic
pub struct KafkaCommandSource {
    consumer: StreamConsumer,
}

impl KafkaCommandSource {
    /// Subscribe to the command topic
    ///
    /// Joins from the latest offset: commands published while the service
    /// was down describe a configuration nobody is maintaining anymore.
    pub fn new(bootstrap: &str, group: &str, topic: &str) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap)
            .set("group.id", group)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "latest")
            .create()
            .map_err(|e| BusError::Transport(e.to_string()))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| BusError::Transport(e.to_string()))?;

        Ok(Self { consumer })
    }

    /// Wait for the next command payload
    pub async fn next(&self) -> Result<Vec<u8>> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| BusError::Transport(e.to_string()))?;

        Ok(message.payload().map(<[u8]>::to_vec).unwrap_or_default())
    }
}
