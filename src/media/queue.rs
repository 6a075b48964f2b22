//! Bounded frame queue with drop-oldest backpressure
//!
//! Sits between the frame producer (usually a capture thread) and the
//! broadcaster task. When the producer outruns the viewers the oldest frames
//! are discarded, so viewers always see recent content rather than a growing
//! backlog.
//!
//! `put` is synchronous so it can be called from a plain OS thread. The lock is
//! a `std::sync::Mutex` held only for the push/pop itself, never across an
//! `.await`. Consumers wait on a [`Notify`] instead of polling.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::Notify;

/// Default queue capacity
pub const DEFAULT_CAPACITY: usize = 8;

/// Result of [`FrameQueue::put`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// Frame was queued; `dropped` older frames were discarded to make room
    Queued { dropped: usize },
    /// Frame was empty and has been ignored
    Rejected,
}

/// Bounded FIFO of encoded frames
#[derive(Debug)]
pub struct FrameQueue {
    frames: Mutex<VecDeque<Bytes>>,
    capacity: usize,
    notify: Notify,
}

impl FrameQueue {
    /// Create a queue holding at most `capacity` frames (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            notify: Notify::new(),
        }
    }

    /// Append a frame, discarding the oldest frames on overflow
    ///
    /// Empty frames signal a transient capture failure and are ignored.
    pub fn put(&self, frame: Bytes) -> PutOutcome {
        if frame.is_empty() {
            return PutOutcome::Rejected;
        }

        let dropped = {
            let mut frames = self.lock();
            frames.push_back(frame);

            let mut dropped = 0;
            while frames.len() > self.capacity {
                frames.pop_front();
                dropped += 1;
            }
            dropped
        };

        self.notify.notify_one();
        PutOutcome::Queued { dropped }
    }

    /// Remove and return the oldest frame, if any
    pub fn take(&self) -> Option<Bytes> {
        self.lock().pop_front()
    }

    /// Wait until a frame may be available
    ///
    /// A `put` that happens while nobody is waiting leaves a permit behind, so
    /// a wakeup between checking [`take`](Self::take) and calling this is not
    /// lost. Wakeups can be spurious; callers re-check with `take`.
    pub async fn ready(&self) {
        self.notify.notified().await;
    }

    /// Number of queued frames
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum number of frames held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discard every queued frame
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Bytes>> {
        // A panic while holding the lock cannot leave the deque half-updated
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
