//! Admin moderation endpoints
//!
//! Moderation needs the session's admin identity with admin mode on. The
//! pending-queue event stream ends as soon as either goes away.

use crate::api::admin::schemas::{AdminMode, Reviewed};
use crate::api::suggestions::schemas::SuggestionList;
use crate::api::{ApiError, ExtractSession};
use crate::core::registry::SessionRegistry;
use crate::core::traits::SuggestionStore;
use crate::infrastructure::entities::{ReviewDecision, SuggestionStatus};
use async_stream::stream;
use axum::extract::Path;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;
use futures_util::Stream;
use log::info;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/mode", post(set_admin_mode))
        .route("/suggestions", get(list_pending))
        .route("/suggestions/events", get(pending_events))
        .route("/suggestions/:id/approve", post(approve))
        .route("/suggestions/:id/reject", post(reject))
}

async fn set_admin_mode(
    Inject(registry): Inject<SessionRegistry>,
    ExtractSession(session_id): ExtractSession,
    Json(mode): Json<AdminMode>,
) -> Result<Json<AdminMode>, ApiError> {
    let session = registry.get(session_id)?;

    if mode.enabled {
        session.admin.enter_admin_mode()?;
    } else {
        session.admin.exit_admin_mode();
    }

    Ok(Json(AdminMode {
        enabled: session.admin.is_admin_mode(),
    }))
}

async fn list_pending(
    Inject(registry): Inject<SessionRegistry>,
    Inject(store): Inject<dyn SuggestionStore>,
    ExtractSession(session_id): ExtractSession,
) -> Result<Json<SuggestionList>, ApiError> {
    registry.get(session_id)?.admin.require_admin_mode()?;

    let pending = store.list_by_status(SuggestionStatus::Pending).await?;

    Ok(Json(pending.into()))
}

async fn pending_events(
    Inject(registry): Inject<SessionRegistry>,
    Inject(store): Inject<dyn SuggestionStore>,
    ExtractSession(session_id): ExtractSession,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let session = registry.get(session_id)?;
    session.admin.require_admin_mode()?;

    let mut identity = session.admin.current_identity();
    let mut admin_mode = session.admin.admin_mode();
    drop(session);

    let mut pending = store.watch_by_status(SuggestionStatus::Pending);

    let stream = stream! {
        loop {
            let next = tokio::select! {
                snapshot = pending.next() => snapshot,
                _ = identity.wait_for(Option::is_none) => None,
                _ = admin_mode.wait_for(|enabled| !enabled) => None,
            };

            let Some(snapshot) = next else {
                break;
            };

            yield Event::default()
                .event("pending")
                .json_data(SuggestionList::from(snapshot));
        }

        pending.cancel();
        info!("pending suggestions stream for session {session_id} closed");
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn approve(
    Inject(registry): Inject<SessionRegistry>,
    Inject(store): Inject<dyn SuggestionStore>,
    ExtractSession(session_id): ExtractSession,
    Path(suggestion_id): Path<Uuid>,
) -> Result<Json<Reviewed>, ApiError> {
    review(
        &registry,
        &*store,
        session_id,
        suggestion_id,
        ReviewDecision::Approved,
    )
    .await
    .map_err(|e| e.on_failure("Failed to approve suggestion."))
}

async fn reject(
    Inject(registry): Inject<SessionRegistry>,
    Inject(store): Inject<dyn SuggestionStore>,
    ExtractSession(session_id): ExtractSession,
    Path(suggestion_id): Path<Uuid>,
) -> Result<Json<Reviewed>, ApiError> {
    review(
        &registry,
        &*store,
        session_id,
        suggestion_id,
        ReviewDecision::Rejected,
    )
    .await
    .map_err(|e| e.on_failure("Failed to reject suggestion."))
}

async fn review(
    registry: &SessionRegistry,
    store: &dyn SuggestionStore,
    session_id: Uuid,
    suggestion_id: Uuid,
    decision: ReviewDecision,
) -> Result<Json<Reviewed>, ApiError> {
    let identity = registry.get(session_id)?.admin.require_admin_mode()?;

    let suggestion = store.set_status(suggestion_id, decision).await?;
    info!(
        "suggestion {suggestion_id} {} by {}",
        suggestion.status, identity.email
    );

    let message = match decision {
        ReviewDecision::Approved => "Suggestion approved and added to dictionary.",
        ReviewDecision::Rejected => "Suggestion rejected.",
    };

    Ok(Json(Reviewed {
        message,
        suggestion: suggestion.into(),
    }))
}

pub mod schemas {
    use crate::api::suggestions::schemas::Suggestion;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug)]
    pub struct AdminMode {
        pub enabled: bool,
    }

    #[derive(Serialize, Debug)]
    pub struct Reviewed {
        pub message: &'static str,
        pub suggestion: Suggestion,
    }
}
