//! Bounded FIFO queues connecting adjacent stages.
//!
//! A [`BoundedQueue`] is created whole and then split into exactly one
//! [`QueueWriter`] for the producing stage and one [`QueueReader`] for the
//! consuming stage. A capacity of `0` means unbounded. When the queue is
//! bounded and full, [`QueueWriter::enqueue`] suspends the producer until the
//! consumer makes room; this is the pipeline's only backpressure mechanism.

use crate::error::{PipelineError, Result};
use flume::{Receiver, Sender, TryRecvError};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

struct QueueShared {
    name: &'static str,
    capacity: usize,
    closed: AtomicBool,
    /// Wakes readers parked in `dequeue` when the queue closes
    on_close: Notify,
}

impl QueueShared {
    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.on_close.notify_waiters();
    }

    async fn send<T>(&self, sender: &Sender<T>, item: T) -> Result<()> {
        if self.is_closed() {
            return Err(self.closed_error());
        }
        sender
            .send_async(item)
            .await
            .map_err(|_| self.closed_error())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn closed_error(&self) -> PipelineError {
        PipelineError::invalid_state(format!("{} queue used after close", self.name))
    }
}

/// A FIFO channel with an optional capacity bound.
pub struct BoundedQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    shared: Arc<QueueShared>,
}

impl<T: Send> BoundedQueue<T> {
    /// Create a queue. `capacity == 0` makes it unbounded.
    #[must_use]
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (sender, receiver) = if capacity > 0 {
            flume::bounded(capacity)
        } else {
            flume::unbounded()
        };
        Self {
            sender,
            receiver,
            shared: Arc::new(QueueShared {
                name,
                capacity,
                closed: AtomicBool::new(false),
                on_close: Notify::new(),
            }),
        }
    }

    /// Enqueue an item, suspending while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidState`] if the queue has been closed.
    pub async fn enqueue(&self, item: T) -> Result<()> {
        self.shared.send(&self.sender, item).await
    }

    /// Take the oldest item without waiting.
    pub fn try_dequeue(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    pub fn count(&self) -> usize {
        self.receiver.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn close(&self) {
        self.shared.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Split into the producer and consumer handles.
    #[must_use]
    pub fn split(self) -> (QueueWriter<T>, QueueReader<T>) {
        let writer = QueueWriter {
            sender: self.sender,
            shared: Arc::clone(&self.shared),
        };
        let reader = QueueReader {
            receiver: self.receiver,
            shared: self.shared,
        };
        (writer, reader)
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("name", &self.shared.name)
            .field("capacity", &self.shared.capacity)
            .field("count", &self.receiver.len())
            .field("closed", &self.shared.is_closed())
            .finish()
    }
}

/// Producer side of a queue. Dropping it closes the queue.
pub struct QueueWriter<T> {
    sender: Sender<T>,
    shared: Arc<QueueShared>,
}

impl<T: Send> QueueWriter<T> {
    /// Enqueue an item, suspending while the queue is full.
    ///
    /// If the returned future is dropped before it completes, the item is
    /// dropped with it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidState`] if the queue has been closed or
    /// its reader is gone.
    pub async fn enqueue(&self, item: T) -> Result<()> {
        self.shared.send(&self.sender, item).await
    }

    pub fn count(&self) -> usize {
        self.sender.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Close the queue. The reader may still drain what is left.
    pub fn close(&self) {
        self.shared.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// A count-only view used by the orchestrator.
    #[must_use]
    pub fn probe(&self) -> QueueProbe<T> {
        QueueProbe {
            sender: self.sender.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for QueueWriter<T> {
    fn drop(&mut self) {
        self.shared.close();
    }
}

/// Consumer side of a queue.
pub struct QueueReader<T> {
    receiver: Receiver<T>,
    shared: Arc<QueueShared>,
}

impl<T: Send> QueueReader<T> {
    /// Take the oldest item without waiting.
    pub fn try_dequeue(&self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait for the next item. Returns `None` once the queue is closed and
    /// empty.
    pub async fn dequeue(&self) -> Option<T> {
        loop {
            if let Some(item) = self.try_dequeue() {
                return Some(item);
            }
            if self.is_drained() {
                return None;
            }
            // Register for the close signal before re-checking the flag, so a
            // close in between still wakes us.
            let closed = self.shared.on_close.notified();
            tokio::pin!(closed);
            closed.as_mut().enable();
            if self.is_closed() {
                continue;
            }
            tokio::select! {
                received = self.receiver.recv_async() => {
                    if let Ok(item) = received {
                        return Some(item);
                    }
                }
                () = &mut closed => {}
            }
        }
    }

    pub fn count(&self) -> usize {
        self.receiver.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Closed by the writer and nothing left to take.
    pub fn is_drained(&self) -> bool {
        // closed is read first: everything enqueued before close is visible
        self.shared.is_closed() && self.receiver.is_empty()
    }
}

/// Count-only handle to a queue.
pub struct QueueProbe<T> {
    sender: Sender<T>,
    shared: Arc<QueueShared>,
}

impl<T> QueueProbe<T> {
    pub fn count(&self) -> usize {
        self.sender.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

impl<T> Clone for QueueProbe<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}
