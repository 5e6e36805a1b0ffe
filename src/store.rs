//! Status store client.
//!
//! The judge's only view of the outside world: dequeue pending submissions,
//! read the ordered test cases of a problem, and write verdict transitions
//! keyed by submission. Abstracted as a trait so the pipeline can be driven
//! against an in-memory store in tests; the production backend is Redis.
//!
//! Key layout under the configured namespace:
//! - `{ns}:queue`                      list of pending submission payloads (BLPOP)
//! - `{ns}:problem:{pid}:testcases`    list of test-case rows, stored order
//! - `{ns}:status:{sid}`               current verdict string, overwritten in place
//! - `{ns}:status`                     pub/sub channel carrying each transition

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::submission::{Submission, TestCase};
use crate::verdict::Verdict;

const RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("status store request failed: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("malformed row in status store: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The status store contract consumed by the judge pipeline.
#[async_trait]
pub trait StatusStore: Send {
    /// Block until a pending submission is available and dequeue it.
    async fn next_submission(&mut self) -> Result<Submission, StoreError>;

    /// Read the test cases of a problem in stored order.
    async fn fetch_test_cases(&mut self, problem_id: i64) -> Result<Vec<TestCase>, StoreError>;

    /// Overwrite the submission's current verdict. Idempotent; the write is
    /// keyed by submission identifier only.
    async fn publish_verdict(
        &mut self,
        submission_id: i64,
        verdict: Verdict,
    ) -> Result<(), StoreError>;
}

/// Redis-backed [`StatusStore`].
pub struct RedisStore {
    client: redis::Client,
    conn: MultiplexedConnection,
    namespace: String,
}

impl RedisStore {
    /// Connect to the store, retrying until the server is reachable.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = redis::Client::open(config.url.as_str())?;
        let conn = connect_with_retry(&client).await;
        info!("connected to status store at {}", config.url);

        Ok(Self {
            client,
            conn,
            namespace: config.namespace.clone(),
        })
    }

    async fn reconnect(&mut self) {
        self.conn = connect_with_retry(&self.client).await;
    }

    fn queue_key(&self) -> String {
        queue_key(&self.namespace)
    }

    fn testcases_key(&self, problem_id: i64) -> String {
        testcases_key(&self.namespace, problem_id)
    }

    fn verdict_key(&self, submission_id: i64) -> String {
        verdict_key(&self.namespace, submission_id)
    }

    fn channel_key(&self) -> String {
        channel_key(&self.namespace)
    }
}

fn queue_key(namespace: &str) -> String {
    format!("{}:queue", namespace)
}

fn testcases_key(namespace: &str, problem_id: i64) -> String {
    format!("{}:problem:{}:testcases", namespace, problem_id)
}

fn verdict_key(namespace: &str, submission_id: i64) -> String {
    format!("{}:status:{}", namespace, submission_id)
}

fn channel_key(namespace: &str) -> String {
    format!("{}:status", namespace)
}

#[async_trait]
impl StatusStore for RedisStore {
    async fn next_submission(&mut self) -> Result<Submission, StoreError> {
        loop {
            let popped: Option<(String, String)> =
                match self.conn.blpop(self.queue_key(), 0.0).await {
                    Ok(res) => res,
                    Err(e) => {
                        warn!("BLPOP on submission queue failed: {}. Reconnecting...", e);
                        self.reconnect().await;
                        continue;
                    }
                };

            if let Some((_, payload)) = popped {
                match serde_json::from_str::<Submission>(&payload) {
                    Ok(submission) => return Ok(submission),
                    Err(e) => {
                        warn!("discarding malformed submission payload: {}", e);
                        continue;
                    }
                }
            }
        }
    }

    async fn fetch_test_cases(&mut self, problem_id: i64) -> Result<Vec<TestCase>, StoreError> {
        let rows: Vec<String> = self
            .conn
            .lrange(self.testcases_key(problem_id), 0, -1)
            .await?;

        rows.iter()
            .map(|row| serde_json::from_str(row).map_err(StoreError::from))
            .collect()
    }

    async fn publish_verdict(
        &mut self,
        submission_id: i64,
        verdict: Verdict,
    ) -> Result<(), StoreError> {
        let key = self.verdict_key(submission_id);
        let value = verdict.to_string();

        // One reconnect-and-retry; a write that still fails is the caller's
        // problem to record.
        if let Err(e) = self.conn.set::<_, _, ()>(&key, &value).await {
            warn!("verdict write failed: {}. Reconnecting...", e);
            self.reconnect().await;
            self.conn.set::<_, _, ()>(&key, &value).await?;
        }

        // Transition notifications are best-effort; there may be nobody
        // subscribed.
        let event = serde_json::json!({
            "submission_id": submission_id,
            "verdict": value,
        });
        let _ = self
            .conn
            .publish::<_, _, ()>(self.channel_key(), event.to_string())
            .await;

        Ok(())
    }
}

async fn connect_with_retry(client: &redis::Client) -> MultiplexedConnection {
    loop {
        match client.get_multiplexed_async_connection().await {
            Ok(conn) => return conn,
            Err(e) => {
                warn!(
                    "failed to connect to status store: {}. Retrying in {:?}...",
                    e, RECONNECT_DELAY
                );
                sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(queue_key("judge"), "judge:queue");
        assert_eq!(testcases_key("judge", 9), "judge:problem:9:testcases");
        assert_eq!(verdict_key("judge", 42), "judge:status:42");
        assert_eq!(channel_key("judge"), "judge:status");
    }

    #[test]
    fn test_testcase_rows_decode_in_order() {
        let rows = [
            r#"{"input":"1 1\n","output":"2\n"}"#,
            r#"{"input":"2 3\n","output":"5\n"}"#,
        ];
        let cases: Vec<TestCase> = rows
            .iter()
            .map(|row| serde_json::from_str(row).unwrap())
            .collect();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].output, "2\n");
        assert_eq!(cases[1].input, "2 3\n");
    }
}
