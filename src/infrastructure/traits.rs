//! Infrastructure traits, used for DI on higher levels

use crate::Result;
use crate::infrastructure::auth::{Credential, Identity};
use crate::infrastructure::backend::{SuggestionPayload, TranslationRequest, TranslationResult};
use crate::infrastructure::entities;
use crate::infrastructure::entities::{StoreChange, SuggestionStatus};
use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

#[async_trait]
pub trait SuggestionRepository: Send + Sync {
    /// Inserts a new `pending` record. The store assigns id and timestamp.
    async fn create_suggestion(
        &self,
        suggestion: entities::NewSuggestion,
    ) -> Result<entities::Suggestion>;

    /// All records with the given status, oldest first.
    async fn list_by_status(&self, status: SuggestionStatus)
    -> Result<Vec<entities::Suggestion>>;

    async fn get_suggestion(&self, id: Uuid) -> Result<entities::Suggestion>;

    /// Moves `id` from `from` to `to`.
    ///
    /// Returns `NotFound` if the record is missing and `AlreadyReviewed` if its
    /// status is no longer `from`.
    async fn transition_status(
        &self,
        id: Uuid,
        from: SuggestionStatus,
        to: SuggestionStatus,
    ) -> Result<entities::Suggestion>;

    fn changes(&self) -> broadcast::Receiver<StoreChange>;
}

#[async_trait]
pub trait ConversationLogRepository: Send + Sync {
    async fn append_exchange(
        &self,
        record: entities::ConversationRecord,
    ) -> Result<entities::ConversationRecord>;

    async fn list_session_exchanges(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<entities::ConversationRecord>>;
}

/// The remote translation/suggestion backend.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult>;

    /// Returns the backend's acknowledgment verbatim.
    async fn submit_suggestion(&self, payload: &SuggestionPayload) -> Result<serde_json::Value>;
}

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, credential: &Credential) -> Result<Identity>;
}
