//! Hand-off queue between source reader tasks and the single decode task.
//!
//! Any number of producers push; one consumer drains. Shutdown is explicit
//! and idempotent: once the queue is shut down, the consumer still receives
//! everything already queued before it observes the closed signal, and
//! further pushes are rejected with a typed error.

use std::sync::Mutex;

use thiserror::Error;

/// Returned when a producer pushes after [`HandoffQueue::shutdown`]. That is
/// a caller contract violation, not a normal runtime condition; the rejected
/// item is handed back so the caller can account for it.
#[derive(Debug, Error)]
#[error("hand-off queue is shut down")]
pub struct QueueClosed<T>(pub T);

pub struct HandoffQueue<T> {
    tx: Mutex<Option<flume::Sender<T>>>,
    rx: flume::Receiver<T>,
}

impl<T> HandoffQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            tx: Mutex::new(Some(tx)),
            rx,
        }
    }

    /// Append an item and wake a waiting consumer. Never blocks; fails only
    /// after shutdown.
    pub fn push(&self, item: T) -> Result<(), QueueClosed<T>> {
        // The sender stays locked for the duration of the send so a
        // concurrent shutdown cannot interleave between the open check and
        // the append.
        let guard = self.tx.lock().expect("hand-off queue lock poisoned");
        match guard.as_ref() {
            Some(tx) => match tx.send(item) {
                Ok(()) => Ok(()),
                Err(flume::SendError(item)) => Err(QueueClosed(item)),
            },
            None => Err(QueueClosed(item)),
        }
    }

    /// Wait until an item is available and take it. Returns `None` once the
    /// queue has been shut down *and* every previously queued item has been
    /// drained.
    pub async fn wait_and_pop(&self) -> Option<T> {
        self.rx.recv_async().await.ok()
    }

    /// Close the queue and wake every blocked consumer. Idempotent.
    pub fn shutdown(&self) {
        self.tx.lock().expect("hand-off queue lock poisoned").take();
    }

    pub fn is_shut_down(&self) -> bool {
        self.tx.lock().expect("hand-off queue lock poisoned").is_none()
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl<T> Default for HandoffQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
