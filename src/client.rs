//! Task submission and completion polling.
//!
//! [`CeleryClient`] composes the envelope encoder and the broker into the
//! three operations a producer needs: submit a task, check once for its
//! result, and wait for the result with a bounded deadline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::time::{interval, sleep};
use tracing::debug;

use crate::broker::{Broker, BrokerError, RedisBroker};
use crate::config::{ClientConfig, ConfigError};
use crate::protocol::{Envelope, ProtocolError, ResultMessage, TaskMessage};

/// Errors surfaced by client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The supplied configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A message could not be encoded or a stored result decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The backend rejected or failed an operation.
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),
}

/// Client facade: submit tasks, check and wait for their completion.
///
/// From this client's perspective a task moves through three states:
/// submitted, pending, completed. Execution failure is not distinguished
/// from success; only the presence of a stored, decodable result is
/// observed.
///
/// A client instance owns its configuration for its lifetime and shares
/// one connection pool across all operations, so it can be used from
/// concurrent contexts without external locking.
pub struct CeleryClient {
    broker: Arc<dyn Broker>,
    config: ClientConfig,
    poll_errors: AtomicU64,
}

impl CeleryClient {
    /// Validates the configuration and connects the matching broker
    /// variant.
    ///
    /// The connection strategy (direct endpoint or sentinel failover) is
    /// selected here, once, from the configuration shape.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any connection is attempted,
    /// or a broker error when no backend is reachable.
    pub async fn connect(mut config: ClientConfig) -> Result<Self, ClientError> {
        config.derive_sentinel_addrs();
        config.validate()?;

        let broker = RedisBroker::connect(&config).await?;
        Ok(Self::with_broker(Arc::new(broker), config))
    }

    /// Builds a client over an already-connected broker.
    ///
    /// This is the seam for embedding hosts that manage their own broker
    /// lifecycle, and for tests.
    pub fn with_broker(broker: Arc<dyn Broker>, config: ClientConfig) -> Self {
        Self {
            broker,
            config,
            poll_errors: AtomicU64::new(0),
        }
    }

    /// Submits a task and returns its generated id.
    ///
    /// Keyword arguments are not supported; `args` is the full positional
    /// payload. Nothing is published if encoding fails.
    pub async fn submit(
        &self,
        task_name: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<String, ClientError> {
        let message = TaskMessage::new(task_name, args);
        let envelope = Envelope::wrap(&message, &self.config.queue)?;

        self.broker
            .publish(&self.config.queue, &envelope.to_bytes()?)
            .await?;

        debug!(task = task_name, id = %message.id, queue = %self.config.queue, "task submitted");
        Ok(message.id)
    }

    /// Checks once whether a result has been stored for `task_id`.
    ///
    /// A missing result key is the normal pre-completion state and yields
    /// `Ok(false)`. A present but undecodable payload and backend
    /// failures are errors.
    pub async fn task_completed(&self, task_id: &str) -> Result<bool, ClientError> {
        match self.broker.fetch_result(task_id).await? {
            None => Ok(false),
            Some(raw) => {
                ResultMessage::decode(&raw)?;
                Ok(true)
            }
        }
    }

    /// Waits for a result to appear, checking on the configured interval.
    ///
    /// Returns `true` at the first check that observes a result and
    /// `false` once the configured timeout elapses; deadline expiry is a
    /// normal outcome, not an error. A failed check does not abort the
    /// wait: the error is logged, counted on
    /// [`poll_errors`](Self::poll_errors), and the next tick retries, so
    /// a transient backend blip cannot kill a long-running wait.
    pub async fn wait_for_completion(&self, task_id: &str) -> bool {
        let deadline = sleep(self.config.timeout);
        tokio::pin!(deadline);
        let mut tick = interval(self.config.get_interval);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    debug!(task_id, timeout = ?self.config.timeout, "wait timed out");
                    return false;
                }
                _ = tick.tick() => match self.task_completed(task_id).await {
                    Ok(true) => return true,
                    Ok(false) => {}
                    Err(err) => {
                        self.poll_errors.fetch_add(1, Ordering::Relaxed);
                        debug!(task_id, error = %err, "result check failed, retrying");
                    }
                },
            }
        }
    }

    /// Number of result checks that failed and were retried during waits.
    ///
    /// Waits absorb check errors; this counter is the diagnostic channel
    /// for callers that need to notice a backend misbehaving underneath
    /// an otherwise quiet wait.
    pub fn poll_errors(&self) -> u64 {
        self.poll_errors.load(Ordering::Relaxed)
    }

    /// The queue this client submits to.
    pub fn queue(&self) -> &str {
        &self.config.queue
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    /// What a single `fetch_result` call should return.
    enum FetchStep {
        NotFound,
        Found(Vec<u8>),
        Fail,
    }

    /// Broker double replaying a script of fetch outcomes.
    ///
    /// Once the script is exhausted every further fetch reports not-found,
    /// matching a result that never arrives.
    #[derive(Default)]
    struct ScriptedBroker {
        published: Mutex<Vec<(String, Vec<u8>)>>,
        script: Mutex<VecDeque<FetchStep>>,
    }

    impl ScriptedBroker {
        fn new(script: Vec<FetchStep>) -> Self {
            Self {
                published: Mutex::new(Vec::new()),
                script: Mutex::new(script.into()),
            }
        }

        fn published(&self) -> Vec<(String, Vec<u8>)> {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Broker for ScriptedBroker {
        async fn publish(&self, queue: &str, envelope: &[u8]) -> Result<(), BrokerError> {
            self.published
                .lock()
                .unwrap()
                .push((queue.to_string(), envelope.to_vec()));
            Ok(())
        }

        async fn fetch_result(&self, _task_id: &str) -> Result<Option<Vec<u8>>, BrokerError> {
            match self.script.lock().unwrap().pop_front() {
                None | Some(FetchStep::NotFound) => Ok(None),
                Some(FetchStep::Found(raw)) => Ok(Some(raw)),
                Some(FetchStep::Fail) => {
                    Err(BrokerError::ConnectionFailed("scripted failure".to_string()))
                }
            }
        }
    }

    fn test_client(broker: Arc<ScriptedBroker>) -> CeleryClient {
        let config = ClientConfig::new()
            .with_queue("test-queue")
            .with_timeout(Duration::from_millis(200))
            .with_get_interval(Duration::from_millis(50));
        CeleryClient::with_broker(broker, config)
    }

    fn sample_result() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "task_id": "abc",
            "status": "SUCCESS",
            "traceback": null,
            "result": "ok",
            "children": []
        }))
        .expect("serialization should work")
    }

    #[tokio::test]
    async fn test_submit_publishes_wire_envelope() {
        let broker = Arc::new(ScriptedBroker::default());
        let client = test_client(Arc::clone(&broker));

        let task_id = client
            .submit("tasks.add", vec![json!(2), json!(3)])
            .await
            .expect("submit should succeed");

        let published = broker.published();
        assert_eq!(published.len(), 1);
        let (queue, raw) = &published[0];
        assert_eq!(queue, "test-queue");

        let envelope: Envelope = serde_json::from_slice(raw).expect("wire envelope parses");
        assert_eq!(envelope.properties.delivery_info.routing_key, "test-queue");
        assert_eq!(envelope.properties.delivery_info.exchange, "test-queue");

        let message = TaskMessage::from_body(&envelope.body).expect("body decodes");
        assert_eq!(message.id, task_id);
        assert_eq!(message.task, "tasks.add");
        assert_eq!(message.args, vec![json!(2), json!(3)]);
        assert!(message.kwargs.is_empty());
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_task_name() {
        let broker = Arc::new(ScriptedBroker::default());
        let client = test_client(Arc::clone(&broker));

        let result = client.submit("", vec![]).await;

        assert!(matches!(
            result,
            Err(ClientError::Protocol(ProtocolError::EmptyTaskName))
        ));
        assert!(broker.published().is_empty());
    }

    #[tokio::test]
    async fn test_task_completed_not_found_is_false_not_error() {
        let client = test_client(Arc::new(ScriptedBroker::default()));

        let completed = client
            .task_completed("never-submitted")
            .await
            .expect("not-found should not be an error");
        assert!(!completed);
    }

    #[tokio::test]
    async fn test_task_completed_with_stored_result() {
        let broker = Arc::new(ScriptedBroker::new(vec![FetchStep::Found(sample_result())]));
        let client = test_client(broker);

        let completed = client.task_completed("abc").await.expect("check succeeds");
        assert!(completed);
    }

    #[tokio::test]
    async fn test_task_completed_propagates_decode_error() {
        let broker = Arc::new(ScriptedBroker::new(vec![FetchStep::Found(
            b"not json".to_vec(),
        )]));
        let client = test_client(broker);

        let result = client.task_completed("abc").await;
        assert!(matches!(result, Err(ClientError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_wait_returns_false_on_deadline() {
        let client = test_client(Arc::new(ScriptedBroker::default()));

        let start = Instant::now();
        let completed = client.wait_for_completion("missing").await;
        let elapsed = start.elapsed();

        assert!(!completed);
        // Bounded by the 200ms timeout, with slack for the test runner
        assert!(elapsed >= Duration::from_millis(190), "returned too early: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(600), "returned too late: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_wait_observes_late_result_before_deadline() {
        // Result appears on the third check, between ticks
        let broker = Arc::new(ScriptedBroker::new(vec![
            FetchStep::NotFound,
            FetchStep::NotFound,
            FetchStep::Found(sample_result()),
        ]));
        let client = test_client(broker);

        let start = Instant::now();
        let completed = client.wait_for_completion("abc").await;
        let elapsed = start.elapsed();

        assert!(completed);
        assert!(elapsed < Duration::from_millis(200), "deadline hit first: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_wait_retries_through_check_errors() {
        let broker = Arc::new(ScriptedBroker::new(vec![
            FetchStep::Fail,
            FetchStep::Fail,
            FetchStep::Found(sample_result()),
        ]));
        let client = test_client(broker);

        let completed = client.wait_for_completion("abc").await;

        assert!(completed);
        assert_eq!(client.poll_errors(), 2);
    }
}
