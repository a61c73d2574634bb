//! Suggestion moderation and vocabulary sync gateway for the English/Mon
//! translation chat

use ramanya_gateway::api;
use ramanya_gateway::config::AppConfig;
use ramanya_gateway::core::registry::SessionRegistry;
use ramanya_gateway::core::services::MySuggestionStore;
use ramanya_gateway::core::vocabulary::VocabularyPool;
use ramanya_gateway::infrastructure::auth::ConfigCredentialVerifier;
use ramanya_gateway::infrastructure::backend::HttpBackendClient;
use ramanya_gateway::infrastructure::database::DatabaseConnection;
use ramanya_gateway::infrastructure::repositories::{
    DbConversationLogRepository, DbSuggestionRepository,
};

use anyhow::anyhow;
use axum::http::Method;
use di::{Injectable, ServiceCollection};
use di_axum::RouterServiceProviderExtensions;
use log::info;
use tokio::runtime::{Builder, Runtime};
use tower_http::cors::{Any, CorsLayer};

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(web_server_task())
}

async fn web_server_task() -> anyhow::Result<()> {
    let provider = ServiceCollection::new()
        .add(AppConfig::singleton())
        .add(DatabaseConnection::singleton())
        .add(DbSuggestionRepository::singleton())
        .add(DbConversationLogRepository::singleton())
        .add(HttpBackendClient::singleton())
        .add(ConfigCredentialVerifier::singleton())
        .add(MySuggestionStore::singleton())
        .add(VocabularyPool::singleton())
        .add(SessionRegistry::singleton())
        .build_provider()
        .map_err(|e| anyhow!("invalid service configuration: {e:?}"))?;

    let config = provider.get_required::<AppConfig>();
    info!("translation backend at {}", config.backend_url);
    if config.admin.is_none() {
        info!("no admin account configured, admin login is disabled");
    }

    provider
        .get_required::<DatabaseConnection>()
        .migrate()
        .await?;

    // Start the approved vocabulary sync before the first session opens.
    let vocabulary = provider.get_required::<VocabularyPool>();
    let registry = provider.get_required::<SessionRegistry>();
    let idle_sweep = SessionRegistry::spawn_idle_sweep(&registry);

    let app = api::router()
        .layer(
            CorsLayer::new()
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_origin(Any),
        )
        .with_provider(provider);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    idle_sweep.abort();
    registry.end_all();
    vocabulary.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {e}");
    }
}
