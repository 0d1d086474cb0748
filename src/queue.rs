//! FIFO of players waiting for an opponent.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::player::Player;

/// Arrival-ordered queue guarded by a mutex, with a [`Notify`] acting as the
/// condition variable that wakes a blocked [`WaitingQueue::dequeue_pair`].
#[derive(Debug)]
pub struct WaitingQueue<T = Player> {
    entries: Mutex<VecDeque<T>>,
    available: Notify,
}

impl<T> Default for WaitingQueue<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            available: Notify::new(),
        }
    }
}

impl<T> WaitingQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append to the tail and wake a waiting consumer.
    pub fn enqueue(&self, entry: T) {
        self.lock().push_back(entry);
        self.available.notify_one();
    }

    /// Return an entry to the head so it keeps its place in line.
    pub fn push_front(&self, entry: T) {
        self.lock().push_front(entry);
        self.available.notify_one();
    }

    /// Remove the two oldest entries if at least two are queued.
    pub fn try_dequeue_pair(&self) -> Option<(T, T)> {
        let mut entries = self.lock();
        if entries.len() < 2 {
            return None;
        }
        let first = entries.pop_front()?;
        let second = entries.pop_front()?;
        if entries.len() >= 2 {
            // Another pair is ready; pass the wake-up on.
            self.available.notify_one();
        }
        Some((first, second))
    }

    /// Wait until at least two entries are queued, then remove the two
    /// oldest together.
    pub async fn dequeue_pair(&self) -> (T, T) {
        loop {
            let notified = self.available.notified();
            if let Some(pair) = self.try_dequeue_pair() {
                return pair;
            }
            notified.await;
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
