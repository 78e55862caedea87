//! Bounded, single-consumer ingestion queue.
//!
//! Decouples the ingestion endpoint from the persistence sink: items are
//! buffered in FIFO order and drained by exactly one handler invocation at
//! a time. Delivery is at-most-once — a full buffer rejects new items and
//! a failed handler discards its item; sensors resend on their next
//! interval tick anyway.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use futures::future::BoxFuture;

/// Default buffer capacity.
pub const DEFAULT_CAPACITY: usize = 100;

/// Returned by [`IngestQueue::enqueue`] when the buffer is full; the item
/// was dropped, already-buffered items are untouched.
#[derive(Debug, thiserror::Error)]
#[error("ingestion queue at capacity ({capacity}); item rejected")]
pub struct QueueFull {
    pub capacity: usize,
}

type Handler<T> = Arc<dyn Fn(T) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct QueueStats {
    enqueued: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
}

/// Counter snapshot; handler failures and capacity rejections are counted
/// here rather than surfaced to the enqueuing caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStatsSnapshot {
    pub enqueued: u64,
    pub processed: u64,
    pub failed: u64,
    pub rejected: u64,
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

struct Buffer<T> {
    items: VecDeque<T>,
    draining: bool,
}

struct Inner<T> {
    capacity: usize,
    buffer: Mutex<Buffer<T>>,
    handler: RwLock<Option<Handler<T>>>,
    stats: QueueStats,
}

/// Bounded FIFO queue with a single async consumer.
///
/// Cheaply cloneable; clones share the same buffer and handler.
pub struct IngestQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for IngestQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> IngestQueue<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity,
                buffer: Mutex::new(Buffer {
                    items: VecDeque::new(),
                    draining: false,
                }),
                handler: RwLock::new(None),
                stats: QueueStats::default(),
            }),
        }
    }

    /// Install the single async consumer.
    ///
    /// Items enqueued before a handler existed stay buffered; installing
    /// the handler starts draining them.
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(T) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync + 'static,
    {
        *self.inner.handler.write().expect("handler lock") = Some(Arc::new(handler));
        self.arm();
    }

    /// Append an item, or reject it if the buffer is full.
    ///
    /// Never blocks; the drain runs on a spawned task.
    pub fn enqueue(&self, item: T) -> Result<(), QueueFull> {
        {
            let mut buf = self.inner.buffer.lock().expect("buffer lock");
            if buf.items.len() >= self.inner.capacity {
                self.inner.stats.rejected.fetch_add(1, Ordering::Relaxed);
                return Err(QueueFull {
                    capacity: self.inner.capacity,
                });
            }
            buf.items.push_back(item);
        }
        self.inner.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        self.arm();
        Ok(())
    }

    /// Number of items currently buffered (excluding one being processed).
    pub fn len(&self) -> usize {
        self.inner.buffer.lock().expect("buffer lock").items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> QueueStatsSnapshot {
        let stats = &self.inner.stats;
        QueueStatsSnapshot {
            enqueued: stats.enqueued.load(Ordering::Relaxed),
            processed: stats.processed.load(Ordering::Relaxed),
            failed: stats.failed.load(Ordering::Relaxed),
            rejected: stats.rejected.load(Ordering::Relaxed),
        }
    }

    /// Spawn the drain task unless one is already running or no handler is
    /// installed yet.
    fn arm(&self) {
        if self.inner.handler.read().expect("handler lock").is_none() {
            return;
        }
        {
            let mut buf = self.inner.buffer.lock().expect("buffer lock");
            if buf.draining || buf.items.is_empty() {
                return;
            }
            buf.draining = true;
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(Inner::drain(inner));
    }
}

impl<T: Send + 'static> Default for IngestQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Inner<T> {
    /// Pop-and-process until the buffer empties.
    ///
    /// At most one of these tasks exists per queue (guarded by the
    /// `draining` flag, toggled under the buffer lock), which is what
    /// serialises handler invocations.
    async fn drain(inner: Arc<Self>) {
        loop {
            let item = {
                let mut buf = inner.buffer.lock().expect("buffer lock");
                match buf.items.pop_front() {
                    Some(item) => item,
                    None => {
                        buf.draining = false;
                        return;
                    }
                }
            };

            let handler = inner
                .handler
                .read()
                .expect("handler lock")
                .clone()
                .expect("drain only armed with a handler installed");

            match handler(item).await {
                Ok(()) => {
                    inner.stats.processed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    inner.stats.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(error = %e, "Ingestion handler failed; item discarded");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Poll until `cond` holds or a short deadline passes.
    async fn wait_until(cond: impl Fn() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached within deadline");
    }

    #[tokio::test]
    async fn processes_items_in_fifo_order() {
        let queue: IngestQueue<u32> = IngestQueue::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_handler = Arc::clone(&seen);
        queue.set_handler(move |item| {
            let seen = Arc::clone(&seen_handler);
            Box::pin(async move {
                seen.lock().unwrap().push(item);
                Ok(())
            })
        });

        for i in 0..20 {
            queue.enqueue(i).unwrap();
        }

        wait_until(|| queue.stats().processed == 20).await;
        assert_eq!(*seen.lock().unwrap(), (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn handler_is_never_reentrant() {
        let queue: IngestQueue<u32> = IngestQueue::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let in_flight_h = Arc::clone(&in_flight);
        let max_seen_h = Arc::clone(&max_seen);
        queue.set_handler(move |_item: u32| {
            let in_flight = Arc::clone(&in_flight_h);
            let max_seen = Arc::clone(&max_seen_h);
            Box::pin(async move {
                let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })
        });

        // Enqueue rapidly from several tasks.
        let mut handles = Vec::new();
        for batch in 0..4u32 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..10 {
                    queue.enqueue(batch * 10 + i).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        wait_until(|| queue.stats().processed == 40).await;
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn full_buffer_rejects_without_losing_buffered_items() {
        // No handler installed, so nothing drains.
        let queue: IngestQueue<u32> = IngestQueue::with_capacity(2);

        queue.enqueue(1).unwrap();
        queue.enqueue(2).unwrap();
        let err = queue.enqueue(3).unwrap_err();

        assert_eq!(err.capacity, 2);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.stats().rejected, 1);

        // The buffered items drain once a handler arrives.
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_handler = Arc::clone(&seen);
        queue.set_handler(move |item| {
            let seen = Arc::clone(&seen_handler);
            Box::pin(async move {
                seen.lock().unwrap().push(item);
                Ok(())
            })
        });

        wait_until(|| queue.stats().processed == 2).await;
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn handler_error_discards_item_and_continues() {
        let queue: IngestQueue<u32> = IngestQueue::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_handler = Arc::clone(&seen);
        queue.set_handler(move |item| {
            let seen = Arc::clone(&seen_handler);
            Box::pin(async move {
                if item == 2 {
                    anyhow::bail!("sink unavailable");
                }
                seen.lock().unwrap().push(item);
                Ok(())
            })
        });

        for i in 0..5 {
            queue.enqueue(i).unwrap();
        }

        wait_until(|| {
            let stats = queue.stats();
            stats.processed + stats.failed == 5
        })
        .await;

        let stats = queue.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.processed, 4);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 3, 4]);
    }

    #[tokio::test]
    async fn drain_goes_idle_and_rearms_on_new_items() {
        let queue: IngestQueue<u32> = IngestQueue::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_handler = Arc::clone(&seen);
        queue.set_handler(move |item| {
            let seen = Arc::clone(&seen_handler);
            Box::pin(async move {
                seen.lock().unwrap().push(item);
                Ok(())
            })
        });

        queue.enqueue(1).unwrap();
        wait_until(|| queue.stats().processed == 1).await;
        assert!(queue.is_empty());

        // A later enqueue starts a fresh drain.
        queue.enqueue(2).unwrap();
        wait_until(|| queue.stats().processed == 2).await;
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }
}
