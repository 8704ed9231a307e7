//! Connection establishment against the Redis backend.
//!
//! Two topologies are supported, selected once from the configuration
//! shape:
//!
//! - **Direct**: a single fixed endpoint behind a pooled, auto-reconnecting
//!   connection manager. Dead connections are health-checked and replaced
//!   transparently on reuse.
//! - **Failover**: a set of sentinel monitors tracks which node is the
//!   current primary. Every new physical connection queries the monitors,
//!   verifies the discovered node's role and connects there, so a primary
//!   promoted between operations is picked up without rebuilding the
//!   client.

use redis::aio::ConnectionManager;
use redis::sentinel::{SentinelClient, SentinelServerType};
use redis::{AsyncCommands, RedisError};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::ClientConfig;

use super::queue::BrokerError;

/// A live handle to the backend.
///
/// Both variants support concurrent operations without caller-side
/// locking: the connection manager is cheaply clonable per operation, and
/// the sentinel client serializes its discovery phase internally.
pub enum BrokerConnection {
    /// Fixed single endpoint.
    Direct(ConnectionManager),
    /// Sentinel-monitored primary discovery.
    Failover(Mutex<SentinelClient>),
}

impl BrokerConnection {
    /// Establishes a connection according to the configuration shape.
    ///
    /// An empty monitor set selects the direct strategy; otherwise the
    /// monitors are used for failover discovery against the configured
    /// primary group.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::ConnectionFailed` when the endpoint URL does
    /// not parse, no monitor is reachable, or no primary is discoverable.
    pub async fn connect(config: &ClientConfig) -> Result<Self, BrokerError> {
        if config.sentinel_addrs.is_empty() {
            let client = redis::Client::open(config.url.as_str())
                .map_err(|e| BrokerError::ConnectionFailed(e.to_string()))?;
            let manager = ConnectionManager::new(client)
                .await
                .map_err(|e| BrokerError::ConnectionFailed(e.to_string()))?;

            debug!(url = %config.url, "connected to redis endpoint");
            Ok(Self::Direct(manager))
        } else {
            let monitors: Vec<String> = config
                .sentinel_addrs
                .iter()
                .map(|addr| normalize_monitor_addr(addr))
                .collect();
            let client = SentinelClient::build(
                monitors,
                config.master_name.clone(),
                None,
                SentinelServerType::Master,
            )
            .map_err(|e| BrokerError::ConnectionFailed(e.to_string()))?;

            debug!(
                master = %config.master_name,
                monitors = config.sentinel_addrs.len(),
                "using sentinel failover discovery"
            );
            Ok(Self::Failover(Mutex::new(client)))
        }
    }

    /// Pushes `payload` onto the head of the list named `key`.
    pub async fn lpush(&self, key: &str, payload: &[u8]) -> Result<(), RedisError> {
        match self {
            Self::Direct(manager) => {
                let mut conn = manager.clone();
                conn.lpush::<_, _, ()>(key, payload).await
            }
            Self::Failover(client) => {
                let mut conn = client.lock().await.get_async_connection().await?;
                conn.lpush::<_, _, ()>(key, payload).await
            }
        }
    }

    /// Reads the value stored at `key`; `None` when the key does not
    /// exist.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RedisError> {
        match self {
            Self::Direct(manager) => {
                let mut conn = manager.clone();
                conn.get::<_, Option<Vec<u8>>>(key).await
            }
            Self::Failover(client) => {
                let mut conn = client.lock().await.get_async_connection().await?;
                conn.get::<_, Option<Vec<u8>>>(key).await
            }
        }
    }
}

/// Sentinel addresses are commonly given as bare `host:port` pairs; the
/// connection layer expects URL form.
fn normalize_monitor_addr(addr: &str) -> String {
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("redis://{addr}")
    }
}
