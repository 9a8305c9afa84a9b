use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

use crate::api::FailureKind;

/// Result of the most recent fetch for one piece of state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    /// No fetch has completed yet.
    NotFetched,
    Success(T),
    /// The fetch succeeded but produced nothing.
    Empty,
    Failure(FailureKind),
}

impl<T> FetchOutcome<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            FetchOutcome::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<FailureKind> {
        match self {
            FetchOutcome::Failure(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}

impl<T> FetchOutcome<Vec<T>> {
    /// `Empty` for an empty list, `Success` otherwise.
    pub fn from_list(items: Vec<T>) -> Self {
        if items.is_empty() {
            FetchOutcome::Empty
        } else {
            FetchOutcome::Success(items)
        }
    }

    /// The list, or an empty slice for every non-success state.
    pub fn items(&self) -> &[T] {
        self.data().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Observable slot holding a [`FetchOutcome`].
///
/// Each fetch claims a generation with [`begin`](Self::begin) and hands it back
/// to [`publish`](Self::publish). A publish is dropped when a later fetch has
/// started since, so the slot ends up reflecting the last fetch issued rather
/// than the last one to finish.
pub struct Observable<T> {
    tx: watch::Sender<FetchOutcome<T>>,
    generation: AtomicU64,
}

impl<T: Clone> Observable<T> {
    pub fn new() -> Self {
        Self {
            tx: watch::Sender::new(FetchOutcome::NotFetched),
            generation: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> FetchOutcome<T> {
        self.tx.borrow().clone()
    }

    /// Receiver that sees the current value and every accepted publish.
    pub fn subscribe(&self) -> watch::Receiver<FetchOutcome<T>> {
        self.tx.subscribe()
    }

    pub(crate) fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Store `outcome` if `generation` is still the latest. Returns whether it
    /// was stored.
    pub(crate) fn publish(&self, generation: u64, outcome: FetchOutcome<T>) -> bool {
        let mut accepted = false;
        self.tx.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *current = outcome;
            accepted = true;
            true
        });

        if !accepted {
            tracing::debug!(generation = generation, "Discarding superseded fetch result");
        }
        accepted
    }
}

impl<T: Clone> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_not_fetched() {
        let slot: Observable<Vec<i32>> = Observable::new();
        assert_eq!(slot.get(), FetchOutcome::NotFetched);
        assert!(slot.get().items().is_empty());
    }

    #[test]
    fn test_publish_current_generation() {
        let slot = Observable::new();
        let generation = slot.begin();
        assert!(slot.publish(generation, FetchOutcome::Success(vec![1, 2])));
        assert_eq!(slot.get().items(), &[1, 2]);
    }

    #[test]
    fn test_stale_generation_discarded() {
        let slot = Observable::new();
        let first = slot.begin();
        let second = slot.begin();

        assert!(slot.publish(second, FetchOutcome::Success(vec![2])));
        assert!(!slot.publish(first, FetchOutcome::Success(vec![1])));
        assert_eq!(slot.get(), FetchOutcome::Success(vec![2]));
    }

    #[tokio::test]
    async fn test_subscriber_notified_only_on_accepted_publish() {
        let slot = Observable::new();
        let mut rx = slot.subscribe();
        let stale = slot.begin();
        let fresh = slot.begin();

        slot.publish(stale, FetchOutcome::Success(vec![0]));
        assert!(!rx.has_changed().unwrap());

        slot.publish(fresh, FetchOutcome::<Vec<i32>>::Empty);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), FetchOutcome::Empty);
    }

    #[test]
    fn test_from_list() {
        assert_eq!(FetchOutcome::<Vec<i32>>::from_list(vec![]), FetchOutcome::Empty);
        assert_eq!(
            FetchOutcome::from_list(vec![1]),
            FetchOutcome::Success(vec![1])
        );
    }

    #[test]
    fn test_failure_accessor() {
        let outcome: FetchOutcome<()> = FetchOutcome::Failure(FailureKind::Transport);
        assert_eq!(outcome.failure(), Some(FailureKind::Transport));
        assert!(!outcome.is_success());
    }
}
