//! Delivery targets for published events.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Why a single delivery failed.
#[derive(Debug, Error)]
#[error("delivery to '{topic}' failed: {reason}")]
pub struct DeliveryError {
    pub topic: String,
    pub reason: String,
}

/// Where the publisher's background task hands serialized events.
///
/// A sink is called from one task at a time, in enqueue order.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, topic: &str, payload: &[u8]) -> Result<(), DeliveryError>;
}

/// Writes every event as a structured `tracing` line.
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl EventSink for TracingSink {
    async fn deliver(&self, topic: &str, payload: &[u8]) -> Result<(), DeliveryError> {
        info!(
            topic = %topic,
            payload = %String::from_utf8_lossy(payload),
            "event delivered"
        );
        Ok(())
    }
}

/// Keeps every delivery in memory. Can be switched into a failing mode.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    delivered: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    failing: Arc<AtomicBool>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail (`true`) or succeed (`false`).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every successful delivery so far, in delivery order.
    pub fn delivered(&self) -> Vec<(String, Vec<u8>)> {
        self.delivered.lock().expect("sink lock poisoned").clone()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn deliver(&self, topic: &str, payload: &[u8]) -> Result<(), DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError {
                topic: topic.to_string(),
                reason: "sink is in failing mode".to_string(),
            });
        }
        self.delivered
            .lock()
            .map_err(|e| DeliveryError { topic: topic.to_string(), reason: e.to_string() })?
            .push((topic.to_string(), payload.to_vec()));
        Ok(())
    }
}
