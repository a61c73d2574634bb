//! Session lifecycle endpoints

use crate::api::ExtractSession;
use crate::api::sessions::schemas::SessionCreated;
use crate::core::registry::SessionRegistry;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new().route("/", post(open_session).delete(end_session))
}

async fn open_session(
    Inject(registry): Inject<SessionRegistry>,
) -> (StatusCode, Json<SessionCreated>) {
    let session = registry.open_session();

    (
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: session.id(),
        }),
    )
}

async fn end_session(
    Inject(registry): Inject<SessionRegistry>,
    ExtractSession(session_id): ExtractSession,
) -> StatusCode {
    if registry.end_session(session_id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub mod schemas {
    use serde::Serialize;
    use uuid::Uuid;

    #[derive(Serialize, Debug)]
    pub struct SessionCreated {
        pub session_id: Uuid,
    }
}
