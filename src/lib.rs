//! celery-client: Celery-protocol task producer and result poller.
//!
//! This library submits tasks to a Celery-compatible task queue backed by
//! Redis and polls the result backend for their completion. Messages are
//! wire-compatible with the Celery v1 protocol, so tasks submitted here can
//! be consumed by unrelated worker fleets implementing the same protocol.

// Core modules
pub mod broker;
pub mod cli;
pub mod client;
pub mod config;
pub mod protocol;

// Re-export the types most callers need
pub use broker::{Broker, BrokerError, RedisBroker};
pub use client::{CeleryClient, ClientError};
pub use config::{ClientConfig, ConfigError};
pub use protocol::{Envelope, ProtocolError, ResultMessage, TaskMessage};
