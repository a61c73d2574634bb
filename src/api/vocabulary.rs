//! Approved vocabulary endpoints

use crate::api::suggestions::schemas::SuggestionList;
use crate::api::vocabulary::schemas::Vocabulary;
use crate::core::traits::SuggestionStore;
use crate::core::vocabulary::VocabularyPool;
use crate::infrastructure::entities::SuggestionStatus;
use async_stream::stream;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;
use futures_util::Stream;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_vocabulary))
        .route("/events", get(vocabulary_events))
}

async fn list_vocabulary(Inject(vocabulary): Inject<VocabularyPool>) -> Json<Vocabulary> {
    Json(vocabulary.terms().into())
}

/// Streams the approved set until the client goes away.
async fn vocabulary_events(
    Inject(store): Inject<dyn SuggestionStore>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let mut approved = store.watch_by_status(SuggestionStatus::Approved);

    let stream = stream! {
        while let Some(snapshot) = approved.next().await {
            yield Event::default()
                .event("vocabulary")
                .json_data(SuggestionList::from(snapshot));
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub mod schemas {
    use crate::api::suggestions::schemas::Suggestion;
    use crate::infrastructure::entities;
    use serde::Serialize;

    /// The approved terms and the "N Terms" count shown next to them.
    #[derive(Serialize, Debug)]
    pub struct Vocabulary {
        pub suggestions: Vec<Suggestion>,
        pub count: usize,
    }

    impl From<Vec<entities::Suggestion>> for Vocabulary {
        fn from(terms: Vec<entities::Suggestion>) -> Self {
            Vocabulary {
                count: terms.len(),
                suggestions: terms.into_iter().map(Suggestion::from).collect(),
            }
        }
    }
}
