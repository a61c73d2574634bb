//! Admin login endpoints

use crate::api::auth::schemas::{IdentityStatus, LoggedIn};
use crate::api::{Ack, ApiError, ExtractSession, ack};
use crate::core::registry::SessionRegistry;
use crate::infrastructure::auth::Credential;
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/identity", get(identity))
}

async fn login(
    Inject(registry): Inject<SessionRegistry>,
    ExtractSession(session_id): ExtractSession,
    Json(credential): Json<Credential>,
) -> Result<Json<LoggedIn>, ApiError> {
    let session = registry.get(session_id)?;
    let identity = session.admin.login(&credential).await?;

    Ok(Json(LoggedIn {
        message: "Welcome back, Admin!",
        identity: identity.into(),
    }))
}

async fn logout(
    Inject(registry): Inject<SessionRegistry>,
    ExtractSession(session_id): ExtractSession,
) -> Result<Json<Ack>, ApiError> {
    registry.get(session_id)?.admin.logout();

    Ok(ack("Logged out successfully."))
}

async fn identity(
    Inject(registry): Inject<SessionRegistry>,
    ExtractSession(session_id): ExtractSession,
) -> Result<Json<IdentityStatus>, ApiError> {
    let session = registry.get(session_id)?;

    Ok(Json(IdentityStatus {
        identity: session.admin.identity().map(Into::into),
        admin_mode: session.admin.is_admin_mode(),
    }))
}

pub mod schemas {
    use crate::infrastructure::auth;
    use chrono::{DateTime, Utc};
    use serde::Serialize;

    #[derive(Serialize, Debug)]
    pub struct Identity {
        pub email: String,
        pub authenticated_at: DateTime<Utc>,
    }

    impl From<auth::Identity> for Identity {
        fn from(identity: auth::Identity) -> Self {
            Identity {
                email: identity.email,
                authenticated_at: identity.authenticated_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct LoggedIn {
        pub message: &'static str,
        pub identity: Identity,
    }

    #[derive(Serialize, Debug)]
    pub struct IdentityStatus {
        pub identity: Option<Identity>,
        pub admin_mode: bool,
    }
}
