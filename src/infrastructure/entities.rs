//! Document store entities

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt::Display;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Approved => "approved",
            SuggestionStatus::Rejected => "rejected",
        }
    }
}

impl Display for SuggestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of an admin review. `pending` is never a valid target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for SuggestionStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => SuggestionStatus::Approved,
            ReviewDecision::Rejected => SuggestionStatus::Rejected,
        }
    }
}

/// Opaque store-assigned ordering token (microseconds since the epoch).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct StoreTimestamp(pub i64);

impl StoreTimestamp {
    pub fn now() -> Self {
        StoreTimestamp(chrono::Utc::now().timestamp_micros())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub original: String,
    pub suggestion: String,
    pub context: Option<String>,
    pub status: SuggestionStatus,
    pub timestamp: StoreTimestamp,
}

#[derive(Debug, Clone)]
pub struct NewSuggestion {
    pub original: String,
    pub suggestion: String,
    pub context: Option<String>,
}

/// One translated exchange in the `conversations` collection.
#[derive(Debug, Clone, FromRow)]
pub struct ConversationRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub input: String,
    /// JSON-encoded translation result.
    pub response: String,
    pub timestamp: StoreTimestamp,
    pub client: String,
    pub has_vocabulary_context: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Suggestions,
    Conversations,
}

/// Published on the change feed after every successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreChange {
    pub collection: Collection,
    pub id: Uuid,
}
