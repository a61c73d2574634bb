//! Approved vocabulary pool.
//!
//! Always-on projection of `approved` suggestions, shared by every session
//! regardless of identity.

use crate::core::subscription::SnapshotSubscription;
use crate::core::traits::SuggestionStore;
use crate::infrastructure::backend::VocabularyTerm;
use crate::infrastructure::entities::{Suggestion, SuggestionStatus};
use di::{Ref, inject, injectable};
use log::info;

pub struct VocabularyPool {
    subscription: SnapshotSubscription,
}

#[injectable]
impl VocabularyPool {
    #[inject]
    pub fn create(store: Ref<dyn SuggestionStore>) -> VocabularyPool {
        Self::start(&*store)
    }
}

impl VocabularyPool {
    pub fn start(store: &dyn SuggestionStore) -> VocabularyPool {
        info!("starting approved vocabulary sync");
        VocabularyPool {
            subscription: store.watch_by_status(SuggestionStatus::Approved),
        }
    }

    pub fn terms(&self) -> Vec<Suggestion> {
        self.subscription.current()
    }

    pub fn len(&self) -> usize {
        self.subscription.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The approved terms in the shape the translate endpoint accepts.
    pub fn as_context(&self) -> Vec<VocabularyTerm> {
        self.terms()
            .into_iter()
            .map(|term| VocabularyTerm {
                original: term.original,
                suggestion: term.suggestion,
                context: term.context,
            })
            .collect()
    }

    pub fn shutdown(&self) {
        self.subscription.cancel();
    }
}
