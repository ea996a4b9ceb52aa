use std::time::Duration;

use async_trait::async_trait;
use engine_core::EngineError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::SignalQueue;

/// Queue and locks on a shared redis instance. `LPUSH`/`BRPOP` carry the
/// FIFO; `SET key value PX <ms> NX` + `DEL` carry the locks.
pub struct RedisQueue {
    /// Connection for regular commands
    commands: ConnectionManager,
    /// Dedicated connection for blocking pops so BRPOP never stalls other
    /// traffic on the multiplexed pipeline
    blocking: ConnectionManager,
    queue_key: String,
}

impl RedisQueue {
    pub async fn connect(url: &str, queue_key: impl Into<String>) -> Result<Self, EngineError> {
        let client =
            redis::Client::open(url).map_err(|e| EngineError::Queue(e.to_string()))?;
        let commands = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| EngineError::Queue(e.to_string()))?;
        let blocking = ConnectionManager::new(client)
            .await
            .map_err(|e| EngineError::Queue(e.to_string()))?;

        Ok(Self {
            commands,
            blocking,
            queue_key: queue_key.into(),
        })
    }
}

#[async_trait]
impl SignalQueue for RedisQueue {
    async fn enqueue(&self, signal_id: &str) -> Result<(), EngineError> {
        let mut conn = self.commands.clone();
        conn.lpush::<_, _, ()>(&self.queue_key, signal_id)
            .await
            .map_err(|e| EngineError::Queue(e.to_string()))
    }

    async fn dequeue_blocking(&self, timeout: Duration) -> Result<Option<String>, EngineError> {
        let mut conn = self.blocking.clone();
        let popped: Option<(String, String)> = conn
            .brpop(&self.queue_key, timeout.as_secs_f64())
            .await
            .map_err(|e| EngineError::Queue(e.to_string()))?;
        Ok(popped.map(|(_, id)| id))
    }

    async fn try_acquire_lock(&self, key: &str, ttl: Duration) -> bool {
        let mut conn = self.commands.clone();
        let result: Result<redis::Value, _> = redis::cmd("SET")
            .arg(key)
            .arg("locked")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .arg("NX")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(redis::Value::Okay) => true,
            Ok(_) => false, // key already held
            Err(e) => {
                // Unreachable lock store: allow progress rather than wedging
                // every worker; at-most-once falls back to the status guard.
                tracing::warn!("Lock store unreachable ({}), proceeding without lock", e);
                true
            }
        }
    }

    async fn release_lock(&self, key: &str) {
        let mut conn = self.commands.clone();
        if let Err(e) = conn.del::<_, ()>(key).await {
            tracing::warn!("Failed to release lock {} ({}), TTL will expire it", key, e);
        }
    }
}
