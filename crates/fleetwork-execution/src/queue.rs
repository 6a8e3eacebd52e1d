//! Work queue
//!
//! Hands Work keys to workers with two guarantees: a key waiting in the
//! queue is stored once no matter how often it is added, and a key is
//! never held by two workers at the same time. A key added while a worker
//! holds it is parked as dirty and queued again when the worker calls
//! [`WorkQueue::done`].

use fleetwork_types::WorkKey;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

#[derive(Debug, Default)]
struct QueueState {
    queue: VecDeque<WorkKey>,
    /// Keys that need processing, queued or parked
    dirty: HashSet<WorkKey>,
    /// Keys currently held by a worker
    processing: HashSet<WorkKey>,
    shutting_down: bool,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<QueueState>,
    notify: Notify,
}

/// Deduplicating queue of Work keys
#[derive(Debug, Clone, Default)]
pub struct WorkQueue {
    inner: Arc<Inner>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as needing processing
    pub async fn add(&self, key: WorkKey) {
        let mut state = self.inner.state.lock().await;
        if state.shutting_down || !state.dirty.insert(key.clone()) {
            return;
        }
        if state.processing.contains(&key) {
            return;
        }
        state.queue.push_back(key);
        drop(state);
        self.inner.notify.notify_one();
    }

    /// Add `key` once `delay` has passed
    pub fn add_after(&self, key: WorkKey, delay: Duration) {
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key).await;
        });
    }

    /// Wait for the next key; `None` once the queue is shut down
    pub async fn get(&self) -> Option<WorkKey> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.inner.state.lock().await;
                if state.shutting_down {
                    return None;
                }
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
            }

            notified.await;
        }
    }

    /// Release `key` after processing; requeue it if it was added meanwhile
    pub async fn done(&self, key: &WorkKey) {
        let mut state = self.inner.state.lock().await;
        state.processing.remove(key);
        if state.dirty.contains(key) && !state.shutting_down {
            state.queue.push_back(key.clone());
            drop(state);
            self.inner.notify.notify_one();
        }
    }

    /// Stop handing out keys and wake every waiting worker
    pub async fn shut_down(&self) {
        let mut state = self.inner.state.lock().await;
        state.shutting_down = true;
        drop(state);
        self.inner.notify.notify_waiters();
    }

    /// Keys waiting to be handed out
    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.queue.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
