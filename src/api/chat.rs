//! Chat endpoints

use crate::api::chat::schemas::{
    CorrectionDraft, CreateCorrection, CreateMessage, MessageAccepted, Transcript,
};
use crate::api::suggestions::schemas::SuggestionCreated;
use crate::api::{ApiError, ExtractSession};
use crate::config::AppConfig;
use crate::core::registry::SessionRegistry;
use crate::core::session::validate_message;
use async_stream::stream;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;
use futures_util::Stream;
use std::sync::Arc;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/messages", get(list_messages).post(post_message))
        .route(
            "/messages/:id/suggestion",
            get(correction_draft).post(suggest_correction),
        )
        .route("/events", get(transcript_events))
}

async fn list_messages(
    Inject(registry): Inject<SessionRegistry>,
    ExtractSession(session_id): ExtractSession,
) -> Result<Json<Transcript>, ApiError> {
    let session = registry.get(session_id)?;

    Ok(Json(Transcript::new(
        &session.chat.transcript(),
        session.chat.in_flight(),
        session.chat.vocabulary_size(),
    )))
}

/// Appends the user message and returns at once; the reply arrives through
/// the transcript.
async fn post_message(
    Inject(registry): Inject<SessionRegistry>,
    Inject(config): Inject<AppConfig>,
    ExtractSession(session_id): ExtractSession,
    Json(message): Json<CreateMessage>,
) -> Result<(StatusCode, Json<MessageAccepted>), ApiError> {
    let text = validate_message(&message.text, config.message_word_limit)?;
    let session = registry.get(session_id)?;

    let pending = session.chat.begin_exchange(text);
    let message_id = pending.request_id;

    tokio::spawn(async move {
        session.chat.resolve_exchange(pending).await;
    });

    Ok((StatusCode::ACCEPTED, Json(MessageAccepted { message_id })))
}

async fn transcript_events(
    Inject(registry): Inject<SessionRegistry>,
    ExtractSession(session_id): ExtractSession,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let session = registry.get(session_id)?;
    let mut transcript = session.chat.watch_transcript();
    // The stream must not keep an ended session alive.
    let session = Arc::downgrade(&session);

    let stream = stream! {
        loop {
            let Some(session) = session.upgrade() else {
                break;
            };
            let snapshot = Transcript::new(
                &transcript.borrow_and_update(),
                session.chat.in_flight(),
                session.chat.vocabulary_size(),
            );
            drop(session);

            yield Event::default().event("transcript").json_data(snapshot);

            if transcript.changed().await.is_err() {
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn correction_draft(
    Inject(registry): Inject<SessionRegistry>,
    ExtractSession(session_id): ExtractSession,
    Path(message_id): Path<Uuid>,
) -> Result<Json<CorrectionDraft>, ApiError> {
    let session = registry.get(session_id)?;
    let draft = session.chat.correction_draft(message_id)?;

    Ok(Json(draft.into()))
}

async fn suggest_correction(
    Inject(registry): Inject<SessionRegistry>,
    ExtractSession(session_id): ExtractSession,
    Path(message_id): Path<Uuid>,
    Json(correction): Json<CreateCorrection>,
) -> Result<(StatusCode, Json<SuggestionCreated>), ApiError> {
    let session = registry.get(session_id)?;

    let id = session
        .chat
        .suggest_correction(
            message_id,
            correction.suggestion,
            correction.context.unwrap_or_default(),
        )
        .await
        .map_err(|e| {
            ApiError::from(e).on_failure("Failed to submit suggestion. Please try again.")
        })?;

    Ok((StatusCode::CREATED, Json(SuggestionCreated::new(id))))
}

pub mod schemas {
    use crate::core::session;
    use crate::infrastructure::backend::TranslationResult;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize, Debug)]
    pub struct CreateMessage {
        pub text: String,
    }

    #[derive(Serialize, Debug)]
    pub struct MessageAccepted {
        pub message_id: Uuid,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "lowercase")]
    pub enum Role {
        User,
        Model,
    }

    #[derive(Serialize, Debug)]
    pub struct Message {
        pub id: Uuid,
        pub role: Role,
        pub timestamp: DateTime<Utc>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub text: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub data: Option<TranslationResult>,
        #[serde(rename = "isError")]
        pub is_error: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub reply_to: Option<Uuid>,
    }

    impl From<&session::ChatMessage> for Message {
        fn from(message: &session::ChatMessage) -> Self {
            Message {
                id: message.id,
                role: match message.role {
                    session::Role::User => Role::User,
                    session::Role::Model => Role::Model,
                },
                timestamp: message.timestamp,
                text: message.text().map(str::to_owned),
                data: message.translation_result().cloned(),
                is_error: message.is_error(),
                reply_to: message.reply_to,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct Transcript {
        pub messages: Vec<Message>,
        pub in_flight: usize,
        pub vocabulary_terms: usize,
    }

    impl Transcript {
        pub fn new(
            messages: &[session::ChatMessage],
            in_flight: usize,
            vocabulary_terms: usize,
        ) -> Self {
            Transcript {
                messages: messages.iter().map(Message::from).collect(),
                in_flight,
                vocabulary_terms,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct CorrectionDraft {
        pub original: String,
        pub current: String,
    }

    impl From<session::CorrectionDraft> for CorrectionDraft {
        fn from(draft: session::CorrectionDraft) -> Self {
            CorrectionDraft {
                original: draft.original,
                current: draft.current,
            }
        }
    }

    #[derive(Deserialize, Debug)]
    pub struct CreateCorrection {
        pub suggestion: String,
        pub context: Option<String>,
    }
}
