pub mod memory;
pub mod redis_queue;

use std::time::Duration;

use async_trait::async_trait;
use engine_core::EngineError;

pub use memory::MemoryQueue;
pub use redis_queue::RedisQueue;

/// FIFO of trade-signal ids plus per-key TTL locks. One implementation sits
/// on a shared key-value store; the in-memory one exists so tests and
/// single-process dev deployments can run without it.
#[async_trait]
pub trait SignalQueue: Send + Sync {
    /// Push a signal id to the tail
    async fn enqueue(&self, signal_id: &str) -> Result<(), EngineError>;

    /// Pop the head, blocking up to `timeout`. `None` on timeout.
    async fn dequeue_blocking(&self, timeout: Duration) -> Result<Option<String>, EngineError>;

    /// Atomically set a sentinel under `key` iff absent, expiring after
    /// `ttl`. When the backing store is unreachable this returns true:
    /// availability is preferred over strict mutual exclusion, and the
    /// store-level status guard is the backstop.
    async fn try_acquire_lock(&self, key: &str, ttl: Duration) -> bool;

    /// Delete the sentinel. Best effort; a lost delete expires via TTL.
    async fn release_lock(&self, key: &str);
}

/// Lock key for one trade signal
pub fn signal_lock_key(signal_id: &str) -> String {
    format!("signal:{signal_id}")
}
