//! Publish and result-lookup operations against the backend.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::config::ClientConfig;

use super::connection::BrokerConnection;

/// Errors that can occur during broker operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Failed to establish a connection to the backend.
    #[error("redis connection failed: {0}")]
    ConnectionFailed(String),

    /// A backend operation failed after the connection was established.
    #[error("redis operation failed: {0}")]
    Redis(#[from] redis::RedisError),
}

/// The narrow operation set the client needs from a backend.
///
/// `fetch_result` distinguishes the expected "no result yet" state from
/// genuine backend failures: `Ok(None)` means the key does not exist and
/// the caller should keep waiting, while `Err` is a connectivity or
/// backend problem.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Appends an encoded envelope onto the queue list.
    ///
    /// A single atomic append; no delivery confirmation beyond the store
    /// accepting the write.
    async fn publish(&self, queue: &str, envelope: &[u8]) -> Result<(), BrokerError>;

    /// Looks up a stored result by task id.
    async fn fetch_result(&self, task_id: &str) -> Result<Option<Vec<u8>>, BrokerError>;
}

/// Redis implementation of the broker operations.
pub struct RedisBroker {
    connection: BrokerConnection,
}

impl RedisBroker {
    /// Connects according to the configuration shape (direct endpoint or
    /// sentinel failover).
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::ConnectionFailed` if no backend is reachable.
    pub async fn connect(config: &ClientConfig) -> Result<Self, BrokerError> {
        let connection = BrokerConnection::connect(config).await?;
        Ok(Self { connection })
    }

    /// Builds a broker over an already-established connection.
    pub fn with_connection(connection: BrokerConnection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn publish(&self, queue: &str, envelope: &[u8]) -> Result<(), BrokerError> {
        self.connection.lpush(queue, envelope).await?;
        debug!(queue, bytes = envelope.len(), "published task envelope");
        Ok(())
    }

    async fn fetch_result(&self, task_id: &str) -> Result<Option<Vec<u8>>, BrokerError> {
        Ok(self.connection.get(task_id).await?)
    }
}
