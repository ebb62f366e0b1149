//! Integration test suite for the ZombieRool launcher.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **publish_flow**: publish transaction against the in-memory remote
//! - **delete_flow**: delete transaction, authorization and cleanup
//! - **downloads**: fetcher, coordinator and the engine's install flows over HTTP
//! - **self_update**: helper preparation without spawning
//! - **cli**: the `zrl` binary end to end

mod common;

mod cli;
mod delete_flow;
mod downloads;
mod publish_flow;
mod self_update;
