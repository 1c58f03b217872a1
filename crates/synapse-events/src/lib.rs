//! # synapse-events
//!
//! Advisory telemetry for the Synapse pipeline: agent messages are published
//! best-effort, at most once, and in per-agent program order.
//!
//! ```rust,ignore
//! use synapse_events::{ChannelPublisher, TracingSink};
//!
//! let publisher = ChannelPublisher::spawn(Arc::new(TracingSink));
//! publisher.publish("agent_events", &message);
//! publisher.flush().await;
//! assert_eq!(publisher.failed_publishes(), 0);
//! ```

pub mod publisher;
pub mod sink;

pub use publisher::{ChannelPublisher, PublishStats};
pub use sink::{DeliveryError, EventSink, MemorySink, TracingSink};
