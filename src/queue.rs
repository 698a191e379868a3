//! The outbound FIFO (`send_mutex` in the design doc): a queue of already
//! encoded, already masked wire frames, plus the `is_connected` flag the
//! same mutex protects. Keeping both under one lock is what lets the host
//! observe "am I connected" and "did my frame get queued" atomically with
//! respect to the worker popping frames and flipping that flag on close.

use std::collections::VecDeque;
use std::sync::Mutex;

pub struct SendQueue {
    inner: Mutex<Inner>,
}

struct Inner {
    frames: VecDeque<Vec<u8>>,
    is_connected: bool,
}

impl SendQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                frames: VecDeque::new(),
                is_connected: false,
            }),
        }
    }

    /// Host-callable: enqueue an already-encoded frame.
    pub fn push(&self, frame: Vec<u8>) {
        self.inner.lock().unwrap().frames.push_back(frame);
    }

    /// Worker-only: pop the oldest queued frame.
    pub fn pop_front(&self) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().frames.pop_front()
    }

    /// Worker-only: drop every queued frame, e.g. once a disconnect makes
    /// them moot.
    pub fn clear(&self) {
        self.inner.lock().unwrap().frames.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().frames.is_empty()
    }

    /// Host-callable snapshot of the `Open` state.
    pub fn is_connected(&self) -> bool {
        self.inner.lock().unwrap().is_connected
    }

    /// Worker-only: flip the `is_connected` flag, under the same lock that
    /// guards the queue.
    pub fn set_connected(&self, connected: bool) {
        self.inner.lock().unwrap().is_connected = connected;
    }
}

impl Default for SendQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_fifo_order() {
        let q = SendQueue::new();
        q.push(vec![1]);
        q.push(vec![2]);
        q.push(vec![3]);
        assert_eq!(q.pop_front(), Some(vec![1]));
        assert_eq!(q.pop_front(), Some(vec![2]));
        assert_eq!(q.pop_front(), Some(vec![3]));
        assert_eq!(q.pop_front(), None);
    }

    #[test]
    fn clear_drops_everything() {
        let q = SendQueue::new();
        q.push(vec![1]);
        q.push(vec![2]);
        q.clear();
        assert!(q.is_empty());
    }

    #[test]
    fn is_connected_defaults_false() {
        let q = SendQueue::new();
        assert!(!q.is_connected());
        q.set_connected(true);
        assert!(q.is_connected());
    }
}
