//! Broker abstraction over the Redis backend.
//!
//! This module provides the narrow operation set the client needs from a
//! backend and the two connection strategies it can run over:
//!
//! - **queue**: the [`Broker`] capability (publish an envelope, fetch a
//!   result) and its Redis implementation
//! - **connection**: endpoint resolution, direct single endpoint vs
//!   sentinel failover discovery
//!
//! The queue is a plain Redis list: publishing is a head push onto the
//! list named by the queue, and workers drain it from the tail. Results
//! are plain keys written by workers under the task id.

pub mod connection;
pub mod queue;

// Re-export main types for convenience
pub use connection::BrokerConnection;
pub use queue::{Broker, BrokerError, RedisBroker};
