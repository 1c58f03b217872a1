//! # synapse-contracts
//!
//! Shared types and contracts for the Synapse agent pipeline.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions and error types.

pub mod error;
pub mod llm;
pub mod memory;
pub mod run;
pub mod state;
pub mod task;
