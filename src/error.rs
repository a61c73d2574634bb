//! Crate-wide error kinds

use crate::infrastructure::entities::SuggestionStatus;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum Error {
    /// The translation/suggestion backend could not be reached or answered non-2xx.
    #[error("translation backend unavailable: {0}")]
    NetworkUnavailable(String),

    /// The document store failed a read, write or subscription.
    #[error("document store unavailable: {0}")]
    StoreUnavailable(String),

    /// Login failed. Wrong password, unknown user and an unconfigured
    /// auth service all collapse into this one kind.
    #[error("authentication failed")]
    AuthError,

    /// The caller has no admin identity.
    #[error("admin identity required")]
    NotAdmin,

    #[error("no record with id {0}")]
    NotFound(Uuid),

    #[error("suggestion and original text must not be empty")]
    EmptySuggestion,

    /// A chat message was blank or over the word limit.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Status transitions only leave `pending`.
    #[error("suggestion {id} was already reviewed ({status})")]
    AlreadyReviewed { id: Uuid, status: SuggestionStatus },
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::StoreUnavailable(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::NetworkUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
