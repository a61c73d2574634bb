use crate::Error;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;
use std::str::FromStr;
use uuid::Uuid;

pub mod admin;
pub mod auth;
pub mod chat;
pub mod sessions;
pub mod suggestions;
pub mod vocabulary;

const X_SESSION_ID: &str = "X-Session-ID";

/// Every route the presentation layer talks to.
pub fn router() -> Router {
    Router::new()
        .nest("/sessions", sessions::router())
        .nest("/chat", chat::router())
        .nest("/suggestions", suggestions::router())
        .nest("/vocabulary", vocabulary::router())
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
}

#[derive(Debug)]
pub struct ExtractSession(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for ExtractSession
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, (StatusCode, &'static str)> {
        if let Some(session_id) = parts.headers.get(X_SESSION_ID) {
            let session_id = session_id
                .to_str()
                .map_err(|_| (StatusCode::BAD_REQUEST, "invalid session id"))?;
            let session_id = Uuid::from_str(session_id)
                .map_err(|_| (StatusCode::BAD_REQUEST, "invalid session id"))?;
            Ok(ExtractSession(session_id))
        } else {
            Err((StatusCode::BAD_REQUEST, "`X-Session-ID` header is missing"))
        }
    }
}

/// Acknowledgment body for successful user actions.
#[derive(Serialize, Debug)]
pub struct Ack {
    pub message: &'static str,
}

pub fn ack(message: &'static str) -> Json<Ack> {
    Json(Ack { message })
}

#[derive(Serialize, Debug)]
struct ErrorBody {
    error: String,
}

/// An error on its way to the presentation layer.
#[derive(Debug)]
pub struct ApiError {
    error: Error,
    message: Option<&'static str>,
}

impl ApiError {
    /// Replaces the generic text of backend/store failures with an
    /// action-specific one, e.g. "Failed to approve suggestion.".
    pub fn on_failure(mut self, message: &'static str) -> Self {
        if matches!(
            self.error,
            Error::StoreUnavailable(_) | Error::NetworkUnavailable(_)
        ) {
            self.message = Some(message);
        }
        self
    }

    fn status(&self) -> StatusCode {
        match self.error {
            Error::EmptySuggestion | Error::InvalidMessage(_) => StatusCode::BAD_REQUEST,
            Error::AuthError => StatusCode::UNAUTHORIZED,
            Error::NotAdmin => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::AlreadyReviewed { .. } => StatusCode::CONFLICT,
            Error::NetworkUnavailable(_) => StatusCode::BAD_GATEWAY,
            Error::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn user_message(&self) -> String {
        if let Some(message) = self.message {
            return message.to_owned();
        }

        match &self.error {
            Error::EmptySuggestion => "Please enter a suggestion.".to_owned(),
            Error::InvalidMessage(reason) => format!("Cannot send message: {reason}."),
            Error::AuthError => "Invalid email or password".to_owned(),
            Error::NotAdmin => "Admin login required.".to_owned(),
            Error::NotFound(_) => "Not found.".to_owned(),
            Error::AlreadyReviewed { status, .. } => {
                format!("This suggestion was already {status}.")
            }
            Error::NetworkUnavailable(_) => {
                "The translation service is unavailable. Please try again.".to_owned()
            }
            Error::StoreUnavailable(_) => {
                "Database connection not available. Please check your configuration.".to_owned()
            }
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError {
            error,
            message: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorBody {
                error: self.user_message(),
            }),
        )
            .into_response()
    }
}
