//! Per-channel serialization of conversation turns.
//!
//! Handlers run on their own tasks, so two mentions in the same channel could
//! otherwise read the same history and append out of order. A handler takes its
//! place in the channel's queue with [`ChannelLocks::reserve`] *before* it is
//! spawned, and waits for its turn with [`ChannelSlot::acquire`] once running.
//! Turns in one channel therefore run in the order their events were dispatched,
//! while different channels proceed in parallel.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::watch;

/// Table of per-channel queues keyed by channel ID.
///
/// Each entry is the completion signal of the most recent reservation in that
/// channel. This is trivially cloneable; clones share the same table.
#[derive(Clone, Default)]
pub struct ChannelLocks {
    inner: Arc<Mutex<HashMap<String, watch::Receiver<()>>>>,
}

/// A place in a channel's queue that has not started yet.
///
/// Dropping a slot before [`acquire`](ChannelSlot::acquire) completes gives up its place.
pub struct ChannelSlot {
    previous: Option<watch::Receiver<()>>,
    done: watch::Sender<()>,
}

/// Exclusive access to a channel. The next slot in line starts when this drops.
pub struct ChannelGuard {
    _done: watch::Sender<()>,
}

impl ChannelLocks {
    /// Take the next place in the channel's queue, without waiting.
    pub fn reserve(&self, channel_id: &str) -> ChannelSlot {
        let (done, finished) = watch::channel(());

        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        // Entries whose holder is gone can go.
        map.retain(|_, finished| finished.has_changed().is_ok());

        let previous = map.insert(channel_id.to_string(), finished);

        ChannelSlot { previous, done }
    }

    /// Reserve a place and wait for it.
    pub async fn lock(&self, channel_id: &str) -> ChannelGuard {
        self.reserve(channel_id).acquire().await
    }

    /// Number of channels currently tracked.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no channel is currently tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChannelSlot {
    /// Wait until every earlier reservation in the channel has released its guard.
    pub async fn acquire(self) -> ChannelGuard {
        if let Some(mut previous) = self.previous {
            // Nothing is ever sent; this resolves when the previous sender drops.
            let _ = previous.changed().await;
        }

        ChannelGuard { _done: self.done }
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_channel_is_exclusive() {
        let locks = ChannelLocks::default();

        let guard = locks.lock("C1").await;

        let waiting = tokio::time::timeout(Duration::from_millis(50), locks.lock("C1")).await;
        assert!(waiting.is_err(), "Second lock on the same channel should wait");

        drop(guard);

        let reacquired = tokio::time::timeout(Duration::from_millis(50), locks.lock("C1")).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn different_channels_do_not_block() {
        let locks = ChannelLocks::default();

        let _a = locks.lock("CA").await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.lock("CB")).await;

        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn released_channels_are_pruned() {
        let locks = ChannelLocks::default();

        drop(locks.lock("C1").await);
        drop(locks.lock("C2").await);

        // Reserving C3 prunes the released C1 and C2.
        let _c3 = locks.lock("C3").await;

        assert_eq!(locks.len(), 1);
        assert!(!locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn slots_run_in_reservation_order() {
        let locks = ChannelLocks::default();
        let order = Arc::new(Mutex::new(Vec::new()));

        let slots = (0..8).map(|i| (i, locks.reserve("C1"))).collect::<Vec<_>>();

        // Spawn in reverse so the runtime is free to start the later ones first.
        let handles = slots
            .into_iter()
            .rev()
            .map(|(i, slot)| {
                let order = order.clone();
                tokio::spawn(async move {
                    let _guard = slot.acquire().await;
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    order.lock().unwrap().push(i);
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), (0..8).collect::<Vec<_>>());
    }
}
