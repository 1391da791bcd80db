//! Stream configuration manager
//!
//! Owns the live set of update handlers and applies reconfiguration
//! commands against it. The whole map is guarded by one async lock, so a
//! command is applied atomically with respect to status snapshots.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use pvf_bus::{ChannelMonitor, Producer};
use pvf_protocol::{ConfigCommand, StatusSnapshot, StreamSpec, StreamStatus};
use tokio::sync::RwLock;

use crate::handler::{HandlerStatus, UpdateHandler};
use crate::CoreError;

/// Outcome of applying one reconfiguration command
///
/// Failures are per-stream: one bad spec in an `add` never blocks its
/// siblings.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Channels newly streamed
    pub added: Vec<String>,
    /// Channels whose spec changed; the old handler was stopped first
    pub replaced: Vec<String>,
    /// Channels re-added with an identical spec; handler left untouched
    pub unchanged: Vec<String>,
    /// Channels no longer streamed
    pub removed: Vec<String>,
    /// Specs that could not be applied, with the reason
    pub failed: Vec<(String, CoreError)>,
}

impl ApplyReport {
    /// Whether every requested change was applied
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

struct StreamEntry {
    spec: StreamSpec,
    handler: UpdateHandler,
    status: Arc<HandlerStatus>,
}

/// Keeps the running handler set consistent with the applied configuration
pub struct StreamConfigManager {
    producer: Arc<dyn Producer>,
    monitor: Arc<dyn ChannelMonitor>,
    streams: RwLock<HashMap<String, StreamEntry>>,
}

impl StreamConfigManager {
    pub fn new(producer: Arc<dyn Producer>, monitor: Arc<dyn ChannelMonitor>) -> Self {
        Self {
            producer,
            monitor,
            streams: RwLock::new(HashMap::new()),
        }
    }

    /// Apply one reconfiguration command to the live stream set
    ///
    /// `add` merges into the current set: new channels are spawned, changed
    /// specs replace their handler, identical specs are no-ops. `remove`
    /// and `remove_all` stop handlers and wait for them to finish, so once
    /// this returns no removed channel publishes again.
    pub async fn apply(&self, command: ConfigCommand) -> ApplyReport {
        let mut streams = self.streams.write().await;
        let mut report = ApplyReport::default();

        match command {
            ConfigCommand::Add(specs) => {
                for spec in specs {
                    self.apply_one(&mut streams, spec, &mut report).await;
                }
            }
            ConfigCommand::Remove(channels) => {
                for channel in channels {
                    match streams.remove(&channel) {
                        Some(mut entry) => {
                            entry.handler.stop().await;
                            report.removed.push(channel);
                        }
                        // Removing an unknown channel is a no-op.
                        None => tracing::debug!(channel, "remove for unknown channel ignored"),
                    }
                }
            }
            ConfigCommand::RemoveAll => {
                for (channel, mut entry) in streams.drain() {
                    entry.handler.stop().await;
                    report.removed.push(channel);
                }
            }
        }

        tracing::info!(
            added = report.added.len(),
            replaced = report.replaced.len(),
            removed = report.removed.len(),
            failed = report.failed.len(),
            streaming = streams.len(),
            "configuration applied"
        );
        report
    }

    async fn apply_one(
        &self,
        streams: &mut HashMap<String, StreamEntry>,
        spec: StreamSpec,
        report: &mut ApplyReport,
    ) {
        if let Some(entry) = streams.get(&spec.channel) {
            if entry.spec == spec {
                report.unchanged.push(spec.channel);
                return;
            }
        }

        // Spawn the replacement before stopping the old handler: if the new
        // spec is bad, the existing stream keeps running.
        match UpdateHandler::spawn(spec.clone(), Arc::clone(&self.producer), self.monitor.as_ref())
        {
            Ok(handler) => {
                let status = handler.status();
                if let Some(mut old) = streams.remove(&spec.channel) {
                    old.handler.stop().await;
                    report.replaced.push(spec.channel.clone());
                } else {
                    report.added.push(spec.channel.clone());
                }
                streams.insert(
                    spec.channel.clone(),
                    StreamEntry {
                        spec,
                        handler,
                        status,
                    },
                );
            }
            Err(e) => {
                tracing::warn!(channel = %spec.channel, error = %e, "stream not applied");
                report.failed.push((spec.channel, e));
            }
        }
    }

    /// Snapshot the live stream set for status reporting
    pub async fn snapshot(&self) -> StatusSnapshot {
        let streams = self.streams.read().await;
        let mut entries: Vec<StreamStatus> = streams
            .values()
            .map(|entry| StreamStatus {
                channel: entry.spec.channel.clone(),
                topic: entry.spec.topic.clone(),
                schema: entry.spec.schema.clone(),
                connected: entry.status.connected(),
            })
            .collect();
        entries.sort_by(|a, b| a.channel.cmp(&b.channel));

        StatusSnapshot {
            timestamp_ms: now_ms(),
            streams: entries,
        }
    }

    /// Number of currently configured streams
    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Stop every handler; used on service shutdown
    pub async fn shutdown(&self) {
        let report = self.apply(ConfigCommand::RemoveAll).await;
        tracing::info!(stopped = report.removed.len(), "all streams stopped");
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
