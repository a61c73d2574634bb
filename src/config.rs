//! Environment-driven configuration

use di::{inject, injectable};
use log::warn;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "https://moncbserver-main.onrender.com";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:ramanya.db?mode=rwc";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
pub const DEFAULT_CLIENT_TAG: &str = "gateway_v1";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_url: String,
    pub database_url: String,
    pub bind_address: String,
    pub translate_timeout: Duration,
    pub translate_max_retries: u32,
    pub retry_base_delay: Duration,
    pub watch_poll_interval: Duration,
    pub session_ttl: Duration,
    pub session_idle_timeout: Duration,
    pub client_tag: String,
    pub message_word_limit: usize,
    pub forward_vocabulary: bool,
    pub mirror_suggestions_to_backend: bool,
    pub admin: Option<AdminAccount>,
}

/// The single admin account. The password is kept only as a SHA-256 hex digest.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub email: String,
    pub password_sha256: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_owned(),
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            bind_address: DEFAULT_BIND_ADDRESS.to_owned(),
            translate_timeout: Duration::from_secs(30),
            translate_max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
            watch_poll_interval: Duration::from_millis(5_000),
            session_ttl: Duration::from_secs(3_600),
            session_idle_timeout: Duration::from_secs(1_800),
            client_tag: DEFAULT_CLIENT_TAG.to_owned(),
            message_word_limit: 30,
            forward_vocabulary: false,
            mirror_suggestions_to_backend: false,
            admin: None,
        }
    }
}

#[injectable]
impl AppConfig {
    #[inject]
    pub fn create() -> AppConfig {
        dotenvy::dotenv().ok();
        Self::from_env()
    }
}

impl AppConfig {
    /// Reads every setting from the process environment, falling back to defaults.
    pub fn from_env() -> AppConfig {
        let defaults = AppConfig::default();

        let admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD_SHA256")) {
            (Ok(email), Ok(digest)) if !email.trim().is_empty() && !digest.trim().is_empty() => {
                Some(AdminAccount {
                    email: email.trim().to_owned(),
                    password_sha256: digest.trim().to_lowercase(),
                })
            }
            _ => {
                warn!("ADMIN_EMAIL / ADMIN_PASSWORD_SHA256 not set, admin login is disabled");
                None
            }
        };

        AppConfig {
            backend_url: env::var("BACKEND_URL")
                .ok()
                .filter(|url| !url.trim().is_empty())
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or(defaults.backend_url),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            translate_timeout: env_parse("TRANSLATE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.translate_timeout),
            translate_max_retries: env_parse("TRANSLATE_MAX_RETRIES")
                .unwrap_or(defaults.translate_max_retries),
            retry_base_delay: env_parse("RETRY_BASE_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base_delay),
            watch_poll_interval: env_parse("WATCH_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.watch_poll_interval),
            session_ttl: env_parse("SESSION_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
            session_idle_timeout: env_parse("SESSION_IDLE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_idle_timeout),
            client_tag: env::var("CLIENT_TAG").unwrap_or(defaults.client_tag),
            message_word_limit: env_parse("MESSAGE_WORD_LIMIT")
                .unwrap_or(defaults.message_word_limit),
            forward_vocabulary: env_parse("FORWARD_VOCABULARY")
                .unwrap_or(defaults.forward_vocabulary),
            mirror_suggestions_to_backend: env_parse("MIRROR_SUGGESTIONS_TO_BACKEND")
                .unwrap_or(defaults.mirror_suggestions_to_backend),
            admin,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| T::from_str(s.trim()).ok())
}
