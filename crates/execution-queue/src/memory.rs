use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use engine_core::EngineError;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::SignalQueue;

/// Process-local queue with the same contract as the redis-backed one.
/// Used by tests and by dev deployments that run without a key-value store.
/// FIFO holds within the process only.
#[derive(Default)]
pub struct MemoryQueue {
    items: Mutex<VecDeque<String>>,
    locks: Mutex<HashMap<String, Instant>>,
    notify: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SignalQueue for MemoryQueue {
    async fn enqueue(&self, signal_id: &str) -> Result<(), EngineError> {
        self.items.lock().await.push_back(signal_id.to_string());
        self.notify.notify_one();
        Ok(())
    }

    async fn dequeue_blocking(&self, timeout: Duration) -> Result<Option<String>, EngineError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(id) = self.items.lock().await.pop_front() {
                return Ok(Some(id));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let _ = tokio::time::timeout(deadline - now, self.notify.notified()).await;
        }
    }

    async fn try_acquire_lock(&self, key: &str, ttl: Duration) -> bool {
        let mut locks = self.locks.lock().await;
        let now = Instant::now();
        locks.retain(|_, expires| *expires > now);

        if locks.contains_key(key) {
            return false;
        }
        locks.insert(key.to_string(), now + ttl);
        true
    }

    async fn release_lock(&self, key: &str) {
        self.locks.lock().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let queue = MemoryQueue::new();
        queue.enqueue("a").await.unwrap();
        queue.enqueue("b").await.unwrap();

        let first = queue
            .dequeue_blocking(Duration::from_millis(50))
            .await
            .unwrap();
        let second = queue
            .dequeue_blocking(Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(first.as_deref(), Some("a"));
        assert_eq!(second.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn empty_queue_times_out_with_none() {
        let queue = MemoryQueue::new();
        let popped = queue
            .dequeue_blocking(Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(popped, None);
    }

    #[tokio::test]
    async fn blocked_consumer_wakes_on_enqueue() {
        let queue = std::sync::Arc::new(MemoryQueue::new());
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue_blocking(Duration::from_secs(2)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.enqueue("late").await.unwrap();

        let popped = consumer.await.unwrap().unwrap();
        assert_eq!(popped.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn lock_is_exclusive_until_released() {
        let queue = MemoryQueue::new();
        assert!(queue.try_acquire_lock("signal:1", Duration::from_secs(60)).await);
        assert!(!queue.try_acquire_lock("signal:1", Duration::from_secs(60)).await);
        // A different key is independent
        assert!(queue.try_acquire_lock("signal:2", Duration::from_secs(60)).await);

        queue.release_lock("signal:1").await;
        assert!(queue.try_acquire_lock("signal:1", Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn expired_lock_can_be_reacquired() {
        let queue = MemoryQueue::new();
        assert!(queue.try_acquire_lock("signal:1", Duration::from_millis(10)).await);
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(queue.try_acquire_lock("signal:1", Duration::from_millis(10)).await);
    }
}
