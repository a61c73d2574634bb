//! DB Repository abstractions

use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{
    Collection, ConversationRecord, NewSuggestion, StoreChange, StoreTimestamp, Suggestion,
    SuggestionStatus,
};
use crate::infrastructure::traits::{ConversationLogRepository, SuggestionRepository};
use crate::{Error, Result};
use async_trait::async_trait;
use di::{Ref, injectable};
use log::error;
use tokio::sync::broadcast;
use uuid::Uuid;

fn store_error(e: sqlx::Error) -> Error {
    error!("{e}");
    Error::from(e)
}

#[injectable(SuggestionRepository)]
pub struct DbSuggestionRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbSuggestionRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl SuggestionRepository for DbSuggestionRepository {
    async fn create_suggestion(&self, suggestion: NewSuggestion) -> Result<Suggestion> {
        let created: Suggestion = sqlx::query_as(
            "INSERT INTO suggestions (id, original, suggestion, context, status, timestamp) VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(suggestion.original)
        .bind(suggestion.suggestion)
        .bind(suggestion.context)
        .bind(SuggestionStatus::Pending)
        .bind(StoreTimestamp::now())
        .fetch_one(&**self.connection)
        .await
        .map_err(store_error)?;

        self.connection.publish(StoreChange {
            collection: Collection::Suggestions,
            id: created.id,
        });

        Ok(created)
    }

    async fn list_by_status(&self, status: SuggestionStatus) -> Result<Vec<Suggestion>> {
        sqlx::query_as(
            "SELECT * FROM suggestions WHERE status = ? ORDER BY timestamp ASC, rowid ASC",
        )
        .bind(status)
        .fetch_all(&**self.connection)
        .await
        .map_err(store_error)
    }

    async fn get_suggestion(&self, id: Uuid) -> Result<Suggestion> {
        sqlx::query_as("SELECT * FROM suggestions WHERE id = ?")
            .bind(id)
            .fetch_optional(&**self.connection)
            .await
            .map_err(store_error)?
            .ok_or(Error::NotFound(id))
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: SuggestionStatus,
        to: SuggestionStatus,
    ) -> Result<Suggestion> {
        let updated: Option<Suggestion> = sqlx::query_as(
            "UPDATE suggestions SET status = ? WHERE id = ? AND status = ? RETURNING *",
        )
        .bind(to)
        .bind(id)
        .bind(from)
        .fetch_optional(&**self.connection)
        .await
        .map_err(store_error)?;

        match updated {
            Some(suggestion) => {
                self.connection.publish(StoreChange {
                    collection: Collection::Suggestions,
                    id,
                });
                Ok(suggestion)
            }
            None => {
                let current = self.get_suggestion(id).await?;
                Err(Error::AlreadyReviewed {
                    id,
                    status: current.status,
                })
            }
        }
    }

    fn changes(&self) -> broadcast::Receiver<StoreChange> {
        self.connection.changes()
    }
}

#[injectable(ConversationLogRepository)]
pub struct DbConversationLogRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbConversationLogRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl ConversationLogRepository for DbConversationLogRepository {
    async fn append_exchange(&self, record: ConversationRecord) -> Result<ConversationRecord> {
        let stored: ConversationRecord = sqlx::query_as(
            "INSERT INTO conversations (id, session_id, input, response, timestamp, client, has_vocabulary_context) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(record.id)
        .bind(record.session_id)
        .bind(record.input)
        .bind(record.response)
        .bind(StoreTimestamp::now())
        .bind(record.client)
        .bind(record.has_vocabulary_context)
        .fetch_one(&**self.connection)
        .await
        .map_err(store_error)?;

        self.connection.publish(StoreChange {
            collection: Collection::Conversations,
            id: stored.id,
        });

        Ok(stored)
    }

    async fn list_session_exchanges(&self, session_id: Uuid) -> Result<Vec<ConversationRecord>> {
        sqlx::query_as(
            "SELECT * FROM conversations WHERE session_id = ? ORDER BY timestamp ASC, rowid ASC",
        )
        .bind(session_id)
        .fetch_all(&**self.connection)
        .await
        .map_err(store_error)
    }
}
