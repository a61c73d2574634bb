//! Live snapshot subscriptions over the suggestions collection.
//!
//! A subscription owns a background task that re-runs the filtered query
//! whenever the store's change feed reports a write to `suggestions`, or
//! when the poll interval elapses (writers outside this process do not
//! reach the change feed). A snapshot is delivered only when the filtered set
//! actually differs from the previous one. The initial snapshot is always
//! delivered, even when empty.
//!
//! Query failures are soft: they are logged and the subscription keeps the
//! last delivered set, or the empty set if nothing was delivered yet.

use crate::infrastructure::entities::{Collection, Suggestion, SuggestionStatus};
use crate::infrastructure::traits::SuggestionRepository;
use di::Ref;
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::AbortHandle;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct SnapshotSubscription {
    status: SuggestionStatus,
    snapshots: watch::Receiver<Vec<Suggestion>>,
    canceller: SubscriptionCanceller,
}

/// Cancels a subscription from anywhere. Cloneable and idempotent.
#[derive(Clone)]
pub struct SubscriptionCanceller {
    cancelled: Arc<AtomicBool>,
    task: AbortHandle,
}

impl SubscriptionCanceller {
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.task.abort();
            debug!("live subscription cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl SnapshotSubscription {
    /// Starts watching `status`. Must be called from inside a tokio runtime.
    pub fn spawn(
        repo: Ref<dyn SuggestionRepository>,
        status: SuggestionStatus,
        poll_interval: Duration,
    ) -> SnapshotSubscription {
        let (sender, snapshots) = watch::channel(Vec::new());
        let task = tokio::spawn(watch_status(
            repo,
            status,
            sender,
            poll_interval.max(MIN_POLL_INTERVAL),
        ));

        debug!("live subscription for {status} suggestions started");

        SnapshotSubscription {
            status,
            snapshots,
            canceller: SubscriptionCanceller {
                cancelled: Arc::new(AtomicBool::new(false)),
                task: task.abort_handle(),
            },
        }
    }

    pub fn status(&self) -> SuggestionStatus {
        self.status
    }

    /// The most recently delivered snapshot.
    pub fn current(&self) -> Vec<Suggestion> {
        self.snapshots.borrow().clone()
    }

    /// Waits for the next snapshot. Returns `None` once the subscription is
    /// cancelled, including when cancellation happens while waiting.
    pub async fn next(&mut self) -> Option<Vec<Suggestion>> {
        if self.canceller.is_cancelled() {
            return None;
        }

        self.snapshots.changed().await.ok()?;

        if self.canceller.is_cancelled() {
            return None;
        }

        Some(self.snapshots.borrow_and_update().clone())
    }

    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.canceller.is_cancelled()
    }

    pub fn canceller(&self) -> SubscriptionCanceller {
        self.canceller.clone()
    }
}

impl Drop for SnapshotSubscription {
    fn drop(&mut self) {
        self.canceller.cancel();
    }
}

async fn watch_status(
    repo: Ref<dyn SuggestionRepository>,
    status: SuggestionStatus,
    sender: watch::Sender<Vec<Suggestion>>,
    poll_interval: Duration,
) {
    // Subscribe before the first query so no write slips between the two.
    let mut changes = repo.changes();
    let mut delivered: Option<Vec<Suggestion>> = None;

    loop {
        let snapshot = match repo.list_by_status(status).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("live query for {status} suggestions failed, keeping last snapshot: {e}");
                delivered.clone().unwrap_or_default()
            }
        };

        if delivered.as_ref() != Some(&snapshot) {
            if sender.send(snapshot.clone()).is_err() {
                return;
            }
            delivered = Some(snapshot);
        }

        // One deadline per round; unrelated change events must not push it back.
        let poll = tokio::time::sleep(poll_interval);
        tokio::pin!(poll);

        loop {
            tokio::select! {
                change = changes.recv() => match change {
                    Ok(change) if change.collection == Collection::Suggestions => break,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("{status} watcher lagged by {skipped} changes, re-querying");
                        break;
                    }
                    Err(RecvError::Closed) => return,
                },
                _ = &mut poll => break,
                _ = sender.closed() => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::entities::{NewSuggestion, StoreChange, StoreTimestamp};
    use crate::{Error, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::broadcast;
    use uuid::Uuid;

    /// In-memory repository that can be told to fail.
    struct FakeRepository {
        rows: Mutex<Vec<Suggestion>>,
        failing: AtomicBool,
        queries: AtomicUsize,
        changes: broadcast::Sender<StoreChange>,
    }

    impl FakeRepository {
        fn new() -> Arc<Self> {
            let (changes, _) = broadcast::channel(16);
            Arc::new(Self {
                rows: Mutex::new(Vec::new()),
                failing: AtomicBool::new(false),
                queries: AtomicUsize::new(0),
                changes,
            })
        }

        fn insert(&self, status: SuggestionStatus) -> Uuid {
            let id = Uuid::new_v4();
            self.rows.lock().unwrap().push(Suggestion {
                id,
                original: "Hello".to_owned(),
                suggestion: "ဟဲလိုဝ်".to_owned(),
                context: None,
                status,
                timestamp: StoreTimestamp::now(),
            });
            let _ = self.changes.send(StoreChange {
                collection: Collection::Suggestions,
                id,
            });
            id
        }
    }

    #[async_trait]
    impl SuggestionRepository for FakeRepository {
        async fn create_suggestion(&self, _: NewSuggestion) -> Result<Suggestion> {
            unimplemented!()
        }

        async fn list_by_status(&self, status: SuggestionStatus) -> Result<Vec<Suggestion>> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(Error::StoreUnavailable("offline".to_owned()));
            }
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.status == status)
                .cloned()
                .collect())
        }

        async fn get_suggestion(&self, id: Uuid) -> Result<Suggestion> {
            Err(Error::NotFound(id))
        }

        async fn transition_status(
            &self,
            id: Uuid,
            _: SuggestionStatus,
            _: SuggestionStatus,
        ) -> Result<Suggestion> {
            Err(Error::NotFound(id))
        }

        fn changes(&self) -> broadcast::Receiver<StoreChange> {
            self.changes.subscribe()
        }
    }

    const LONG_POLL: Duration = Duration::from_secs(60);
    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_initial_snapshot_is_delivered_even_when_empty() {
        let repo = FakeRepository::new();
        let mut subscription =
            SnapshotSubscription::spawn(repo, SuggestionStatus::Approved, LONG_POLL);

        let first = tokio::time::timeout(WAIT, subscription.next()).await.unwrap();
        assert_eq!(first, Some(vec![]));
    }

    #[tokio::test]
    async fn test_change_feed_triggers_new_snapshot() {
        let repo = FakeRepository::new();
        let mut subscription =
            SnapshotSubscription::spawn(repo.clone(), SuggestionStatus::Pending, LONG_POLL);
        tokio::time::timeout(WAIT, subscription.next()).await.unwrap();

        let id = repo.insert(SuggestionStatus::Pending);

        let snapshot = tokio::time::timeout(WAIT, subscription.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
        assert_eq!(subscription.current(), snapshot);
    }

    #[tokio::test]
    async fn test_unrelated_writes_do_not_deliver_duplicates() {
        let repo = FakeRepository::new();
        let mut subscription =
            SnapshotSubscription::spawn(repo.clone(), SuggestionStatus::Approved, LONG_POLL);
        tokio::time::timeout(WAIT, subscription.next()).await.unwrap();

        repo.insert(SuggestionStatus::Pending);

        let next = tokio::time::timeout(Duration::from_millis(200), subscription.next()).await;
        assert!(next.is_err(), "membership did not change, nothing should arrive");
    }

    #[tokio::test]
    async fn test_cancel_stops_delivery_and_is_idempotent() {
        let repo = FakeRepository::new();
        let mut subscription =
            SnapshotSubscription::spawn(repo.clone(), SuggestionStatus::Pending, LONG_POLL);
        tokio::time::timeout(WAIT, subscription.next()).await.unwrap();

        subscription.cancel();
        subscription.cancel();
        assert!(subscription.is_cancelled());

        repo.insert(SuggestionStatus::Pending);

        let next = tokio::time::timeout(WAIT, subscription.next()).await.unwrap();
        assert_eq!(next, None);
    }

    #[tokio::test]
    async fn test_cancel_from_clone_wakes_waiting_reader() {
        let repo = FakeRepository::new();
        let mut subscription =
            SnapshotSubscription::spawn(repo, SuggestionStatus::Pending, LONG_POLL);
        tokio::time::timeout(WAIT, subscription.next()).await.unwrap();

        let canceller = subscription.canceller();
        let reader = tokio::spawn(async move { subscription.next().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();

        let result = tokio::time::timeout(WAIT, reader).await.unwrap().unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_query_failure_degrades_to_empty() {
        let repo = FakeRepository::new();
        repo.failing.store(true, Ordering::SeqCst);
        let mut subscription =
            SnapshotSubscription::spawn(repo, SuggestionStatus::Approved, LONG_POLL);

        let first = tokio::time::timeout(WAIT, subscription.next()).await.unwrap();
        assert_eq!(first, Some(vec![]));
    }

    #[tokio::test]
    async fn test_polling_picks_up_silent_writes() {
        let repo = FakeRepository::new();
        let mut subscription = SnapshotSubscription::spawn(
            repo.clone(),
            SuggestionStatus::Pending,
            Duration::from_millis(50),
        );
        tokio::time::timeout(WAIT, subscription.next()).await.unwrap();

        // Bypass the change feed, as an external writer would.
        repo.rows.lock().unwrap().push(Suggestion {
            id: Uuid::new_v4(),
            original: "Thank you".to_owned(),
            suggestion: "တင်ဂုဏ်".to_owned(),
            context: None,
            status: SuggestionStatus::Pending,
            timestamp: StoreTimestamp::now(),
        });

        let snapshot = tokio::time::timeout(WAIT, subscription.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(repo.queries.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_conversation_traffic_does_not_starve_polling() {
        let repo = FakeRepository::new();
        let mut subscription = SnapshotSubscription::spawn(
            repo.clone(),
            SuggestionStatus::Pending,
            Duration::from_millis(150),
        );
        tokio::time::timeout(WAIT, subscription.next()).await.unwrap();

        let chatter = {
            let repo = repo.clone();
            tokio::spawn(async move {
                loop {
                    let _ = repo.changes.send(StoreChange {
                        collection: Collection::Conversations,
                        id: Uuid::new_v4(),
                    });
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
            })
        };

        repo.rows.lock().unwrap().push(Suggestion {
            id: Uuid::new_v4(),
            original: "Good night".to_owned(),
            suggestion: "ညးဍုၚ်".to_owned(),
            context: None,
            status: SuggestionStatus::Pending,
            timestamp: StoreTimestamp::now(),
        });

        let snapshot = tokio::time::timeout(WAIT, subscription.next()).await;
        chatter.abort();

        assert_eq!(snapshot.unwrap().unwrap().len(), 1);
    }
}
