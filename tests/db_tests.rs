//! Database and schema tests
//!
//! Tests SQLite migrations, the repositories and schema constraints

use di::Ref;
use ramanya_gateway::Error;
use ramanya_gateway::infrastructure::database::DatabaseConnection;
use ramanya_gateway::infrastructure::entities::{
    Collection, ConversationRecord, NewSuggestion, StoreTimestamp, SuggestionStatus,
};
use ramanya_gateway::infrastructure::repositories::{
    DbConversationLogRepository, DbSuggestionRepository,
};
use ramanya_gateway::infrastructure::traits::{ConversationLogRepository, SuggestionRepository};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

/// Setup test database with migrations
async fn setup_test_db() -> SqlitePool {
    // One connection, or every new connection would see its own empty database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();
    pool
}

fn new_suggestion(original: &str, suggestion: &str) -> NewSuggestion {
    NewSuggestion {
        original: original.to_owned(),
        suggestion: suggestion.to_owned(),
        context: None,
    }
}

#[tokio::test]
async fn test_database_migrations_work() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();
    let tables: Vec<_> = tables.into_iter().map(|(name,)| name).collect();

    assert!(tables.contains(&"suggestions".to_owned()));
    assert!(tables.contains(&"conversations".to_owned()));
}

#[tokio::test]
async fn test_schema_rejects_blank_suggestion_and_unknown_status() {
    let pool = setup_test_db().await;

    let blank = sqlx::query(
        "INSERT INTO suggestions (id, original, suggestion, status, timestamp) VALUES (?, ?, ?, 'pending', 0)",
    )
    .bind(Uuid::new_v4())
    .bind("Hello")
    .bind("   ")
    .execute(&pool)
    .await;
    assert!(blank.is_err());

    let bad_status = sqlx::query(
        "INSERT INTO suggestions (id, original, suggestion, status, timestamp) VALUES (?, ?, ?, 'archived', 0)",
    )
    .bind(Uuid::new_v4())
    .bind("Hello")
    .bind("ဟဲလိုဝ်")
    .execute(&pool)
    .await;
    assert!(bad_status.is_err());
}

#[tokio::test]
async fn test_create_suggestion_is_pending_and_published() {
    let connection = Ref::new(DatabaseConnection::from_pool(setup_test_db().await));
    let repo = DbSuggestionRepository::new(connection);
    let mut changes = repo.changes();

    let created = repo
        .create_suggestion(NewSuggestion {
            original: "Hello".to_owned(),
            suggestion: "ဟဲလိုဝ်".to_owned(),
            context: Some("greeting".to_owned()),
        })
        .await
        .unwrap();

    assert_eq!(created.status, SuggestionStatus::Pending);
    assert_eq!(created.context.as_deref(), Some("greeting"));

    let change = changes.recv().await.unwrap();
    assert_eq!(change.collection, Collection::Suggestions);
    assert_eq!(change.id, created.id);

    let fetched = repo.get_suggestion(created.id).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_list_by_status_filters_and_orders_oldest_first() {
    let connection = Ref::new(DatabaseConnection::from_pool(setup_test_db().await));
    let repo = DbSuggestionRepository::new(connection);

    let first = repo
        .create_suggestion(new_suggestion("one", "a"))
        .await
        .unwrap();
    let second = repo
        .create_suggestion(new_suggestion("two", "b"))
        .await
        .unwrap();
    let third = repo
        .create_suggestion(new_suggestion("three", "c"))
        .await
        .unwrap();

    repo.transition_status(
        second.id,
        SuggestionStatus::Pending,
        SuggestionStatus::Approved,
    )
    .await
    .unwrap();

    let pending: Vec<_> = repo
        .list_by_status(SuggestionStatus::Pending)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(pending, vec![first.id, third.id]);

    let approved = repo
        .list_by_status(SuggestionStatus::Approved)
        .await
        .unwrap();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].id, second.id);
    assert!(
        repo.list_by_status(SuggestionStatus::Rejected)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_transition_status_reports_missing_and_reviewed_records() {
    let connection = Ref::new(DatabaseConnection::from_pool(setup_test_db().await));
    let repo = DbSuggestionRepository::new(connection);

    let missing = Uuid::new_v4();
    let result = repo
        .transition_status(missing, SuggestionStatus::Pending, SuggestionStatus::Approved)
        .await;
    assert!(matches!(result, Err(Error::NotFound(id)) if id == missing));

    let created = repo
        .create_suggestion(new_suggestion("Hello", "ဟဲလိုဝ်"))
        .await
        .unwrap();
    repo.transition_status(
        created.id,
        SuggestionStatus::Pending,
        SuggestionStatus::Rejected,
    )
    .await
    .unwrap();

    let result = repo
        .transition_status(
            created.id,
            SuggestionStatus::Pending,
            SuggestionStatus::Approved,
        )
        .await;
    assert!(matches!(
        result,
        Err(Error::AlreadyReviewed {
            status: SuggestionStatus::Rejected,
            ..
        })
    ));
    assert_eq!(
        repo.get_suggestion(created.id).await.unwrap().status,
        SuggestionStatus::Rejected
    );
}

#[tokio::test]
async fn test_conversation_log_is_per_session() {
    let connection = Ref::new(DatabaseConnection::from_pool(setup_test_db().await));
    let repo = DbConversationLogRepository::new(connection);

    let session_id = Uuid::new_v4();
    for input in ["Hello", "How are you?"] {
        repo.append_exchange(ConversationRecord {
            id: Uuid::new_v4(),
            session_id,
            input: input.to_owned(),
            response: r#"{"source_language":"English","translation":"..."}"#.to_owned(),
            timestamp: StoreTimestamp::now(),
            client: "gateway_v1".to_owned(),
            has_vocabulary_context: false,
        })
        .await
        .unwrap();
    }

    let exchanges = repo.list_session_exchanges(session_id).await.unwrap();
    let inputs: Vec<_> = exchanges.iter().map(|e| e.input.as_str()).collect();
    assert_eq!(inputs, vec!["Hello", "How are you?"]);

    assert!(
        repo.list_session_exchanges(Uuid::new_v4())
            .await
            .unwrap()
            .is_empty()
    );
}
