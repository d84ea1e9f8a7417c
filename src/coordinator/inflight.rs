//! In-flight Registry
//!
//! One record per key while its producer fetch runs. The record is a watch
//! channel that starts empty and is written exactly once.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use super::Outcome;

/// Receiving side of a record. `None` until the producer publishes.
pub(crate) type OutcomeRx = watch::Receiver<Option<Outcome>>;

/// Registry shared between the coordinator and running producers.
pub(crate) type SharedRegistry = Arc<Mutex<InflightRegistry>>;

// == Inflight Record ==
#[derive(Debug)]
struct InflightRecord {
    /// Identifies the epoch that installed this record
    epoch: u64,
    /// Handed to every waiter that joins the epoch
    done: OutcomeRx,
}

// == Join ==
/// Result of looking a key up in the registry.
pub(crate) enum Join {
    /// The caller created the record and must produce the outcome.
    Owner(EpochGuard, OutcomeRx),
    /// A producer is already running; wait on its record.
    Waiter(OutcomeRx),
}

// == Inflight Registry ==
#[derive(Debug, Default)]
pub(crate) struct InflightRegistry {
    records: HashMap<String, InflightRecord>,
    next_epoch: u64,
}

impl InflightRegistry {
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// Removes the record for `key` only if it still belongs to `epoch`.
    fn remove_epoch(&mut self, key: &str, epoch: u64) -> bool {
        match self.records.get(key) {
            Some(record) if record.epoch == epoch => {
                self.records.remove(key);
                true
            }
            _ => false,
        }
    }
}

// == Join ==
/// Joins the running epoch for `key`, or starts a new one.
///
/// The registry lock is held only for the lookup and insert.
pub(crate) fn join(registry: &SharedRegistry, key: &str) -> Join {
    let mut guard = registry.lock();

    if let Some(record) = guard.records.get(key) {
        return Join::Waiter(record.done.clone());
    }

    let epoch = guard.next_epoch;
    guard.next_epoch += 1;

    let (tx, rx) = watch::channel(None);
    guard.records.insert(
        key.to_string(),
        InflightRecord {
            epoch,
            done: rx.clone(),
        },
    );
    drop(guard);

    let owner = EpochGuard {
        registry: Arc::clone(registry),
        key: key.to_string(),
        epoch,
        tx: Some(tx),
    };
    Join::Owner(owner, rx)
}

// == Epoch Guard ==
/// Producer's handle on its epoch.
///
/// [`publish`](Self::publish) removes the record and then releases waiters.
/// Dropping the guard unpublished still removes the record; waiters then see
/// the channel close with no value.
pub(crate) struct EpochGuard {
    registry: SharedRegistry,
    key: String,
    epoch: u64,
    tx: Option<watch::Sender<Option<Outcome>>>,
}

impl EpochGuard {
    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    /// Ends the epoch with `outcome`.
    pub(crate) fn publish(mut self, outcome: Outcome) {
        self.registry.lock().remove_epoch(&self.key, self.epoch);
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Some(outcome));
        }
    }
}

impl Drop for EpochGuard {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.registry.lock().remove_epoch(&self.key, self.epoch);
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::ResolveError;

    fn registry() -> SharedRegistry {
        Arc::new(Mutex::new(InflightRegistry::default()))
    }

    #[test]
    fn test_first_join_owns_later_joins_wait() {
        let registry = registry();

        let first = join(&registry, "k");
        let second = join(&registry, "k");
        let other = join(&registry, "other");

        assert!(matches!(first, Join::Owner(..)));
        assert!(matches!(second, Join::Waiter(_)));
        assert!(matches!(other, Join::Owner(..)));
        assert_eq!(registry.lock().len(), 2);
    }

    #[test]
    fn test_publish_removes_record_before_release() {
        let registry = registry();
        let Join::Owner(guard, rx) = join(&registry, "k") else {
            panic!("expected owner");
        };

        guard.publish(Err(ResolveError::Internal("x".into())));

        assert_eq!(registry.lock().len(), 0);
        assert!(rx.borrow().is_some());
        assert!(matches!(join(&registry, "k"), Join::Owner(..)));
    }

    #[test]
    fn test_drop_without_publish_removes_record_and_closes() {
        let registry = registry();
        let Join::Owner(guard, rx) = join(&registry, "k") else {
            panic!("expected owner");
        };

        drop(guard);

        assert_eq!(registry.lock().len(), 0);
        assert!(rx.borrow().is_none());
        assert!(rx.has_changed().is_err());
    }

    #[test]
    fn test_stale_guard_does_not_remove_newer_epoch() {
        let registry = registry();
        let mut guard = registry.lock();
        guard.records.insert(
            "k".to_string(),
            InflightRecord {
                epoch: 7,
                done: watch::channel(None).1,
            },
        );
        assert!(!guard.remove_epoch("k", 3));
        assert!(guard.remove_epoch("k", 7));
    }
}
