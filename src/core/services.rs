//! Implementations for the service the app needs.
//!

use crate::config::AppConfig;
use crate::core::subscription::SnapshotSubscription;
use crate::core::traits::SuggestionStore;
use crate::infrastructure::backend::SuggestionPayload;
use crate::infrastructure::entities::{NewSuggestion, ReviewDecision, Suggestion, SuggestionStatus};
use crate::infrastructure::traits::{SuggestionRepository, TranslationBackend};
use crate::{Error, Result};
use async_trait::async_trait;
use di::{Ref, injectable};
use log::{info, warn};
use uuid::Uuid;

#[injectable(SuggestionStore)]
pub struct MySuggestionStore {
    repo: Ref<dyn SuggestionRepository>,
    backend: Ref<dyn TranslationBackend>,
    config: Ref<AppConfig>,
}

impl MySuggestionStore {
    pub fn new(
        repo: Ref<dyn SuggestionRepository>,
        backend: Ref<dyn TranslationBackend>,
        config: Ref<AppConfig>,
    ) -> Self {
        Self {
            repo,
            backend,
            config,
        }
    }

    async fn mirror_to_backend(&self, payload: SuggestionPayload) {
        if let Err(e) = self.backend.submit_suggestion(&payload).await {
            warn!("suggestion stored but mirroring to backend failed: {e}");
        }
    }
}

#[async_trait]
impl SuggestionStore for MySuggestionStore {
    async fn submit(&self, original: String, suggestion: String, context: String) -> Result<Uuid> {
        let suggestion = suggestion.trim().to_owned();
        let context = context.trim().to_owned();

        // `original` is stored verbatim; it only has to carry some text.
        if suggestion.is_empty() || original.trim().is_empty() {
            return Err(Error::EmptySuggestion);
        }

        let created = self
            .repo
            .create_suggestion(NewSuggestion {
                original: original.clone(),
                suggestion: suggestion.clone(),
                context: (!context.is_empty()).then(|| context.clone()),
            })
            .await?;

        info!("suggestion {} submitted for review", created.id);

        if self.config.mirror_suggestions_to_backend {
            self.mirror_to_backend(SuggestionPayload {
                original,
                suggestion,
                context,
            })
            .await;
        }

        Ok(created.id)
    }

    fn watch_by_status(&self, status: SuggestionStatus) -> SnapshotSubscription {
        SnapshotSubscription::spawn(self.repo.clone(), status, self.config.watch_poll_interval)
    }

    async fn list_by_status(&self, status: SuggestionStatus) -> Result<Vec<Suggestion>> {
        self.repo.list_by_status(status).await
    }

    async fn set_status(&self, id: Uuid, decision: ReviewDecision) -> Result<Suggestion> {
        let reviewed = self
            .repo
            .transition_status(id, SuggestionStatus::Pending, decision.into())
            .await?;

        info!("suggestion {id} is now {}", reviewed.status);

        Ok(reviewed)
    }
}
