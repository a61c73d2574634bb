//! Chat session: one client's transcript and its translation exchanges.
//!
//! Each exchange moves through `Sent -> Awaiting -> Resolved | Failed`.
//! The transcript is append-only and published through a `watch` channel,
//! so renderers follow transcript state instead of the network call.
//!
//! Sends are not serialized. Two overlapping exchanges append their replies
//! in completion order, not request order.

use crate::core::traits::SuggestionStore;
use crate::core::vocabulary::VocabularyPool;
use crate::infrastructure::backend::{TranslationRequest, TranslationResult};
use crate::infrastructure::entities::ConversationRecord;
use crate::infrastructure::entities::StoreTimestamp;
use crate::infrastructure::traits::{ConversationLogRepository, TranslationBackend};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use di::Ref;
use log::{debug, error, warn};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::watch;
use uuid::Uuid;

/// Settled exchanges kept for state lookups; older ones are forgotten.
pub const SETTLED_EXCHANGE_LIMIT: usize = 64;

/// Trims `text` and checks it is non-empty and within `word_limit` words.
pub fn validate_message(text: &str, word_limit: usize) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::InvalidMessage("message is empty".to_owned()));
    }

    let words = text.split_whitespace().count();
    if words > word_limit {
        return Err(Error::InvalidMessage(format!(
            "message has {words} words, the limit is {word_limit}"
        )));
    }

    Ok(text.to_owned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePayload {
    Text(String),
    Translation(TranslationResult),
    /// The translation failed. Carries no content.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    pub payload: MessagePayload,
    /// For model messages, the user message they answer.
    pub reply_to: Option<Uuid>,
}

impl ChatMessage {
    fn new(role: Role, payload: MessagePayload, reply_to: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            timestamp: Utc::now(),
            payload,
            reply_to,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, MessagePayload::Text(text.into()), None)
    }

    pub fn translation(request_id: Uuid, result: TranslationResult) -> Self {
        Self::new(
            Role::Model,
            MessagePayload::Translation(result),
            Some(request_id),
        )
    }

    pub fn error(request_id: Uuid) -> Self {
        Self::new(Role::Model, MessagePayload::Error, Some(request_id))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, MessagePayload::Error)
    }

    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            MessagePayload::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn translation_result(&self) -> Option<&TranslationResult> {
        match &self.payload {
            MessagePayload::Translation(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Sent,
    Awaiting,
    Resolved { reply_id: Uuid },
    Failed { reply_id: Uuid },
}

impl ExchangeState {
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            ExchangeState::Resolved { .. } | ExchangeState::Failed { .. }
        )
    }
}

/// A user message that has been appended and is waiting for its reply.
#[derive(Debug)]
pub struct PendingExchange {
    pub request_id: Uuid,
    text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    pub request_id: Uuid,
    pub state: ExchangeState,
}

/// What the correction modal is pre-filled with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionDraft {
    pub original: String,
    pub current: String,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub client_tag: String,
    pub forward_vocabulary: bool,
}

pub struct ChatSession {
    id: Uuid,
    backend: Ref<dyn TranslationBackend>,
    conversations: Ref<dyn ConversationLogRepository>,
    suggestions: Ref<dyn SuggestionStore>,
    vocabulary: Ref<VocabularyPool>,
    settings: SessionSettings,
    transcript: watch::Sender<Vec<ChatMessage>>,
    exchanges: Mutex<Exchanges>,
}

#[derive(Default)]
struct Exchanges {
    states: HashMap<Uuid, ExchangeState>,
    settled: VecDeque<Uuid>,
}

impl Exchanges {
    fn advance(&mut self, request_id: Uuid, state: ExchangeState) {
        self.states.insert(request_id, state);
        if !state.is_settled() {
            return;
        }

        self.settled.push_back(request_id);
        while self.settled.len() > SETTLED_EXCHANGE_LIMIT {
            if let Some(oldest) = self.settled.pop_front() {
                self.states.remove(&oldest);
            }
        }
    }
}

impl ChatSession {
    pub fn new(
        id: Uuid,
        backend: Ref<dyn TranslationBackend>,
        conversations: Ref<dyn ConversationLogRepository>,
        suggestions: Ref<dyn SuggestionStore>,
        vocabulary: Ref<VocabularyPool>,
        settings: SessionSettings,
    ) -> Self {
        let (transcript, _) = watch::channel(Vec::new());
        Self {
            id,
            backend,
            conversations,
            suggestions,
            vocabulary,
            settings,
            transcript,
            exchanges: Mutex::new(Exchanges::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.borrow().clone()
    }

    /// Change notifications for the transcript.
    pub fn watch_transcript(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.transcript.subscribe()
    }

    pub fn exchange_state(&self, request_id: Uuid) -> Option<ExchangeState> {
        self.lock_exchanges().states.get(&request_id).copied()
    }

    /// Number of exchanges still waiting for a reply.
    pub fn in_flight(&self) -> usize {
        self.lock_exchanges()
            .states
            .values()
            .filter(|state| !state.is_settled())
            .count()
    }

    /// Open transcript watchers, such as event streams.
    pub fn watcher_count(&self) -> usize {
        self.transcript.receiver_count()
    }

    /// Size of the approved vocabulary, shown as a statistic.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Runs a whole exchange. Callers usually watch the transcript instead of
    /// using the return value.
    pub async fn send(&self, text: impl Into<String>) -> Exchange {
        let pending = self.begin_exchange(text);
        self.resolve_exchange(pending).await
    }

    /// Appends the user message right away. Always succeeds.
    pub fn begin_exchange(&self, text: impl Into<String>) -> PendingExchange {
        let message = ChatMessage::user(text);
        let pending = PendingExchange {
            request_id: message.id,
            text: message.text().unwrap_or_default().to_owned(),
        };

        self.append(message);
        self.advance(pending.request_id, ExchangeState::Sent);

        pending
    }

    /// Calls the translation backend and appends the reply or an error marker.
    pub async fn resolve_exchange(&self, pending: PendingExchange) -> Exchange {
        let PendingExchange { request_id, text } = pending;

        let request = self.translation_request(&text);
        self.advance(request_id, ExchangeState::Awaiting);

        let (reply, result) = match self.backend.translate(&request).await {
            Ok(result) => (
                ChatMessage::translation(request_id, result.clone()),
                Some(result),
            ),
            Err(e) => {
                error!("Failed to get response for session {}: {e}", self.id);
                (ChatMessage::error(request_id), None)
            }
        };

        let state = match result {
            Some(_) => ExchangeState::Resolved { reply_id: reply.id },
            None => ExchangeState::Failed { reply_id: reply.id },
        };

        // Settle first so transcript watchers never see a stale in-flight count.
        self.advance(request_id, state);
        self.append(reply);

        if let Some(result) = result {
            self.persist_exchange(&text, &result).await;
        }

        Exchange { request_id, state }
    }

    /// The user text and model translation behind a model message.
    pub fn correction_draft(&self, model_message_id: Uuid) -> Result<CorrectionDraft> {
        let transcript = self.transcript.borrow();
        let index = transcript
            .iter()
            .position(|m| m.id == model_message_id)
            .ok_or(Error::NotFound(model_message_id))?;

        let current = transcript[index]
            .translation_result()
            .map(|r| r.translation.clone())
            .ok_or(Error::NotFound(model_message_id))?;

        // Replies land in completion order, so the neighbouring message is
        // not necessarily the request.
        let original = transcript[index]
            .reply_to
            .and_then(|request_id| transcript.iter().find(|m| m.id == request_id))
            .and_then(|m| m.text())
            .ok_or(Error::NotFound(model_message_id))?
            .to_owned();

        Ok(CorrectionDraft { original, current })
    }

    /// Submits a correction for a model message. The user message it answers
    /// becomes the suggestion's `original`.
    pub async fn suggest_correction(
        &self,
        model_message_id: Uuid,
        suggestion: String,
        context: String,
    ) -> Result<Uuid> {
        let draft = self.correction_draft(model_message_id)?;
        self.suggestions
            .submit(draft.original, suggestion, context)
            .await
    }

    fn translation_request(&self, text: &str) -> TranslationRequest {
        let mut request = TranslationRequest::new(text);
        if self.settings.forward_vocabulary && !self.vocabulary.is_empty() {
            request.vocabulary = Some(self.vocabulary.as_context());
        }
        request
    }

    async fn persist_exchange(&self, input: &str, result: &TranslationResult) {
        let response = match serde_json::to_string(result) {
            Ok(response) => response,
            Err(e) => {
                warn!("could not encode translation for history: {e}");
                return;
            }
        };

        let record = ConversationRecord {
            id: Uuid::new_v4(),
            session_id: self.id,
            input: input.to_owned(),
            response,
            timestamp: StoreTimestamp::now(),
            client: self.settings.client_tag.clone(),
            has_vocabulary_context: !self.vocabulary.is_empty(),
        };

        if let Err(e) = self.conversations.append_exchange(record).await {
            error!("Failed to save conversation history: {e}");
        }
    }

    fn append(&self, message: ChatMessage) {
        self.transcript.send_modify(|messages| messages.push(message));
    }

    fn advance(&self, request_id: Uuid, state: ExchangeState) {
        debug!("exchange {request_id} in session {} -> {state:?}", self.id);
        self.lock_exchanges().advance(request_id, state);
    }

    fn lock_exchanges(&self) -> std::sync::MutexGuard<'_, Exchanges> {
        self.exchanges.lock().unwrap_or_else(|p| p.into_inner())
    }
}
