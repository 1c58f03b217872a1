//! The queued, best-effort event publisher.
//!
//! `ChannelPublisher::spawn` starts one background task that drains an
//! unbounded FIFO queue into an `EventSink`. `publish` serializes the message
//! and enqueues it without waiting. A failed delivery is logged at `warn` and
//! counted; it never reaches the caller. `flush` enqueues a barrier and waits
//! for the task to reach it, so every earlier publish has been attempted when
//! it returns.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use synapse_contracts::state::AgentMessage;
use synapse_core::traits::EventPublisher;

use crate::sink::EventSink;

enum Command {
    Publish { topic: String, payload: Vec<u8> },
    Flush(oneshot::Sender<()>),
}

/// Delivery counters shared between the publisher and its task.
#[derive(Debug, Default)]
pub struct PublishStats {
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl PublishStats {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// An `EventPublisher` backed by a background delivery task.
///
/// Must be created inside a Tokio runtime. Dropping every clone closes the
/// queue; the task exits after draining what was already enqueued.
#[derive(Clone)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<Command>,
    stats: Arc<PublishStats>,
}

impl ChannelPublisher {
    pub fn spawn(sink: Arc<dyn EventSink>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(PublishStats::default());
        tokio::spawn(deliver_loop(rx, sink, stats.clone()));
        Self { tx, stats }
    }

    /// Deliveries that failed, including messages that could not be
    /// serialized or enqueued.
    pub fn failed_publishes(&self) -> u64 {
        self.stats.failed()
    }

    pub fn stats(&self) -> Arc<PublishStats> {
        self.stats.clone()
    }
}

#[async_trait]
impl EventPublisher for ChannelPublisher {
    fn publish(&self, topic: &str, message: &AgentMessage) {
        let payload = match serde_json::to_vec(message) {
            Ok(payload) => payload,
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(topic = %topic, agent_id = %message.agent_id, error = %e, "event serialization failed");
                return;
            }
        };

        let command = Command::Publish { topic: topic.to_string(), payload };
        if self.tx.send(command).is_err() {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            warn!(topic = %topic, agent_id = %message.agent_id, "event queue closed, message dropped");
        }
    }

    async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_err() {
            return;
        }
        // The task drops the sender only if it has stopped; nothing is left
        // to wait for in that case.
        let _ = done_rx.await;
    }
}

async fn deliver_loop(
    mut rx: mpsc::UnboundedReceiver<Command>,
    sink: Arc<dyn EventSink>,
    stats: Arc<PublishStats>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Publish { topic, payload } => match sink.deliver(&topic, &payload).await {
                Ok(()) => {
                    stats.delivered.fetch_add(1, Ordering::Relaxed);
                    debug!(topic = %topic, "delivered event");
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(topic = %topic, error = %e, "delivery failed");
                }
            },
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("event delivery task stopped");
}
