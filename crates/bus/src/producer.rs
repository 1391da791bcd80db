//! Producer capability

use async_trait::async_trait;

use crate::Result;

/// Publish capability shared by all update handlers and the status reporter
///
/// Implementations must tolerate concurrent `publish` calls from many tasks
/// with bounded per-call latency. A failed publish is returned to the caller
/// for logging; the producer does not buffer or retry beyond its own
/// transport-level policy.
#[async_trait]
pub trait Producer: Send + Sync {
    /// Publish one payload to a topic
    ///
    /// `key` is the optional partitioning key (stream channel name, so one
    /// channel's updates stay ordered on a single partition).
    async fn publish(&self, topic: &str, key: Option<&[u8]>, payload: &[u8]) -> Result<()>;
}
