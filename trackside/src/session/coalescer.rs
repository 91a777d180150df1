//! Single-slot coalescing hand-off.
//!
//! The producer publishes after every state change; the consumer takes at
//! most one value per render tick. Anything published in between replaces
//! the pending value, so a burst of messages costs one render.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

/// A latest-value slot shared between one producer and one consumer.
#[derive(Debug)]
pub struct Coalescer<T> {
    slot: Mutex<Option<T>>,
    notify: Notify,
    closed: AtomicBool,
    published: AtomicU64,
    delivered: AtomicU64,
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Coalescer<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
        }
    }

    /// Store `value`, replacing any value not yet taken.
    ///
    /// Returns `true` if a pending value was replaced. Ignored once closed.
    pub fn publish(&self, value: T) -> bool {
        if self.is_closed() {
            return false;
        }
        let replaced = self.slot.lock().replace(value).is_some();
        self.published.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();
        replaced
    }

    /// Take the pending value, if any, without waiting.
    pub fn take(&self) -> Option<T> {
        let value = self.slot.lock().take();
        if value.is_some() {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Wait for the next value.
    ///
    /// Returns `None` once the coalescer is closed and drained.
    pub async fn next(&self) -> Option<T> {
        loop {
            if let Some(value) = self.take() {
                return Some(value);
            }
            if self.is_closed() {
                return None;
            }
            self.notify.notified().await;
        }
    }

    /// Whether a value is waiting.
    pub fn has_pending(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Stop accepting values and wake the consumer.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Values published so far.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Values handed to the consumer so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}
