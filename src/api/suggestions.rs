//! Suggestion submission endpoint

use crate::api::suggestions::schemas::{CreateSuggestion, SuggestionCreated};
use crate::api::ApiError;
use crate::core::traits::SuggestionStore;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new().route("/", post(submit_suggestion))
}

/// Anyone may submit; no identity is needed.
async fn submit_suggestion(
    Inject(store): Inject<dyn SuggestionStore>,
    Json(create_suggestion): Json<CreateSuggestion>,
) -> Result<(StatusCode, Json<SuggestionCreated>), ApiError> {
    let id = store
        .submit(
            create_suggestion.original,
            create_suggestion.suggestion,
            create_suggestion.context.unwrap_or_default(),
        )
        .await
        .map_err(|e| {
            ApiError::from(e).on_failure("Failed to submit suggestion. Please try again.")
        })?;

    Ok((StatusCode::CREATED, Json(SuggestionCreated::new(id))))
}

pub mod schemas {
    use crate::infrastructure::entities;
    use crate::infrastructure::entities::{StoreTimestamp, SuggestionStatus};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize, Debug)]
    pub struct CreateSuggestion {
        pub original: String,
        pub suggestion: String,
        pub context: Option<String>,
    }

    #[derive(Serialize, Debug)]
    pub struct SuggestionCreated {
        pub id: Uuid,
        pub message: &'static str,
    }

    impl SuggestionCreated {
        pub fn new(id: Uuid) -> Self {
            SuggestionCreated {
                id,
                message: "Thank you! Your suggestion has been sent to the admin for review.",
            }
        }
    }

    #[derive(Serialize, Debug, Clone)]
    pub struct Suggestion {
        pub id: Uuid,
        pub original: String,
        pub suggestion: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub context: Option<String>,
        pub status: SuggestionStatus,
        pub timestamp: StoreTimestamp,
    }

    impl From<entities::Suggestion> for Suggestion {
        fn from(suggestion: entities::Suggestion) -> Self {
            Suggestion {
                id: suggestion.id,
                original: suggestion.original,
                suggestion: suggestion.suggestion,
                context: suggestion.context,
                status: suggestion.status,
                timestamp: suggestion.timestamp,
            }
        }
    }

    #[derive(Serialize, Debug, Default)]
    pub struct SuggestionList {
        pub suggestions: Vec<Suggestion>,
    }

    impl From<Vec<entities::Suggestion>> for SuggestionList {
        fn from(suggestions: Vec<entities::Suggestion>) -> Self {
            SuggestionList {
                suggestions: suggestions.into_iter().map(Suggestion::from).collect(),
            }
        }
    }
}
