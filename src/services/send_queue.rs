//! Bounded FIFO between producers and the sending worker.
//!
//! Producers block in [`SendQueue::push`] while the queue is full. The single
//! consumer looks at the head with [`SendQueue::peek`] and only removes it with
//! [`SendQueue::pop_front`] once the write succeeded, so a message that fails
//! to send keeps its place at the front.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, Semaphore};

/// Returned by [`SendQueue::push`] once the queue is closed, handing the
/// rejected message back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueClosed(pub String);

/// Bounded FIFO of outbound messages with a single consumer.
pub struct SendQueue {
    items: Mutex<VecDeque<String>>,
    /// One permit per free slot.
    slots: Semaphore,
    available: Notify,
    capacity: usize,
}

impl SendQueue {
    /// Creates a queue holding at most `capacity` messages (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            slots: Semaphore::new(capacity),
            available: Notify::new(),
            capacity,
        }
    }

    /// Appends `message`, waiting for a free slot while the queue is full.
    pub async fn push(&self, message: String) -> Result<(), QueueClosed> {
        match self.slots.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_) => return Err(QueueClosed(message)),
        }

        self.items().push_back(message);
        self.available.notify_one();
        Ok(())
    }

    /// Waits for a head message and returns a copy of it without removing it.
    ///
    /// Returns `None` once the queue is closed. Meant for the single consumer.
    pub async fn peek(&self) -> Option<String> {
        loop {
            let notified = self.available.notified();
            if self.is_closed() {
                return None;
            }
            if let Some(head) = self.items().front().cloned() {
                return Some(head);
            }
            notified.await;
        }
    }

    /// Removes the head after it has been written, freeing its slot.
    pub fn pop_front(&self) -> Option<String> {
        let head = self.items().pop_front();
        if head.is_some() {
            self.slots.add_permits(1);
        }
        head
    }

    /// Rejects further pushes, fails producers waiting for a slot and wakes
    /// the consumer. Messages still queued are abandoned.
    pub fn close(&self) {
        self.slots.close();
        self.available.notify_one();
    }

    /// True once [`SendQueue::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.slots.is_closed()
    }

    /// Messages queued and not yet written.
    pub fn len(&self) -> usize {
        self.items().len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Maximum number of queued messages.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    // VecDeque operations cannot leave the deque half-modified, so a poisoned
    // lock still guards consistent data.
    fn items(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SendQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}
