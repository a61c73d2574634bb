//! DI "Interfaces"

use crate::Result;
use crate::core::subscription::SnapshotSubscription;
use crate::infrastructure::entities;
use crate::infrastructure::entities::{ReviewDecision, SuggestionStatus};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait SuggestionStore: Send + Sync {
    /// Records a new `pending` suggestion and returns its store-assigned id.
    ///
    /// Returns `EmptySuggestion` if `suggestion` is blank after trimming or
    /// `original` is empty, and `StoreUnavailable` if the write fails.
    async fn submit(&self, original: String, suggestion: String, context: String) -> Result<Uuid>;

    /// Opens a live view of every suggestion with the given status.
    ///
    /// Never fails: an unreachable store yields empty snapshots.
    fn watch_by_status(&self, status: SuggestionStatus) -> SnapshotSubscription;

    /// One-shot read of the same set `watch_by_status` delivers.
    async fn list_by_status(&self, status: SuggestionStatus)
    -> Result<Vec<entities::Suggestion>>;

    /// Moves a `pending` suggestion to its reviewed status.
    ///
    /// Access control lives in front of this call. Returns `NotFound` for an
    /// unknown id and `AlreadyReviewed` if the suggestion is no longer pending.
    async fn set_status(
        &self,
        id: Uuid,
        decision: ReviewDecision,
    ) -> Result<entities::Suggestion>;

    async fn approve(&self, id: Uuid) -> Result<entities::Suggestion> {
        self.set_status(id, ReviewDecision::Approved).await
    }

    async fn reject(&self, id: Uuid) -> Result<entities::Suggestion> {
        self.set_status(id, ReviewDecision::Rejected).await
    }
}
