//! Admin credential verification

use crate::config::{AdminAccount, AppConfig};
use crate::infrastructure::traits::CredentialVerifier;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use di::{Ref, inject, injectable};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Clone, Deserialize)]
pub struct Credential {
    pub email: String,
    pub password: String,
}

// Keeps the password out of logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub email: String,
    pub authenticated_at: DateTime<Utc>,
}

pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Verifies against the single admin account from configuration.
pub struct ConfigCredentialVerifier {
    admin: Option<AdminAccount>,
}

#[injectable(CredentialVerifier)]
impl ConfigCredentialVerifier {
    #[inject]
    pub fn create(config: Ref<AppConfig>) -> ConfigCredentialVerifier {
        Self::new(config.admin.clone())
    }
}

impl ConfigCredentialVerifier {
    pub fn new(admin: Option<AdminAccount>) -> ConfigCredentialVerifier {
        ConfigCredentialVerifier { admin }
    }
}

#[async_trait]
impl CredentialVerifier for ConfigCredentialVerifier {
    async fn verify(&self, credential: &Credential) -> Result<Identity> {
        let Some(admin) = &self.admin else {
            warn!("login attempted but no admin account is configured");
            return Err(Error::AuthError);
        };

        let email_matches = admin
            .email
            .eq_ignore_ascii_case(credential.email.trim());
        let password_matches = password_digest(&credential.password) == admin.password_sha256;

        if email_matches && password_matches {
            info!("admin {} authenticated", admin.email);
            Ok(Identity {
                email: admin.email.clone(),
                authenticated_at: Utc::now(),
            })
        } else {
            warn!("rejected login for {:?}", credential.email);
            Err(Error::AuthError)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> ConfigCredentialVerifier {
        ConfigCredentialVerifier::new(Some(AdminAccount {
            email: "admin@example.org".to_owned(),
            password_sha256: password_digest("hunter2"),
        }))
    }

    #[tokio::test]
    async fn test_valid_credentials() {
        let identity = verifier()
            .verify(&Credential {
                email: " Admin@Example.org ".to_owned(),
                password: "hunter2".to_owned(),
            })
            .await
            .unwrap();

        assert_eq!(identity.email, "admin@example.org");
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_are_indistinguishable() {
        let wrong_password = verifier()
            .verify(&Credential {
                email: "admin@example.org".to_owned(),
                password: "hunter3".to_owned(),
            })
            .await;
        let unknown_user = verifier()
            .verify(&Credential {
                email: "someone@example.org".to_owned(),
                password: "hunter2".to_owned(),
            })
            .await;

        assert!(matches!(wrong_password, Err(Error::AuthError)));
        assert!(matches!(unknown_user, Err(Error::AuthError)));
    }

    #[tokio::test]
    async fn test_unconfigured_admin_rejects_everything() {
        let result = ConfigCredentialVerifier::new(None)
            .verify(&Credential {
                email: "admin@example.org".to_owned(),
                password: "hunter2".to_owned(),
            })
            .await;

        assert!(matches!(result, Err(Error::AuthError)));
    }

    #[test]
    fn test_credential_debug_hides_password() {
        let credential = Credential {
            email: "admin@example.org".to_owned(),
            password: "hunter2".to_owned(),
        };
        assert!(!format!("{credential:?}").contains("hunter2"));
    }
}
