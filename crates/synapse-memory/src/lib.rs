//! # synapse-memory
//!
//! Long-term memory backends implementing `synapse_core::traits::MemoryStore`.
//!
//! - `InMemoryMemoryStore`: process-local, for tests and single-process use
//! - `JsonlMemoryStore`: durable append-only JSON-lines file
//!
//! Both rank stored records with a pluggable `Similarity` scorer and drop
//! records below a minimum score, returning `NO_EXPERIENCES_FOUND` when
//! nothing qualifies.

pub mod jsonl;
pub mod memory;
pub mod similarity;

pub use jsonl::JsonlMemoryStore;
pub use memory::InMemoryMemoryStore;
pub use similarity::{Similarity, TokenOverlap, DEFAULT_MIN_SCORE};
