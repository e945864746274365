//! FixFlow API server binary.
//!
//! Serves the JSON API on `FIXFLOW_HOST:FIXFLOW_PORT` (default
//! 127.0.0.1:3000).
//!
//! Migrations are NOT run on startup. Run them explicitly via:
//! `cargo run -p fixflow-cli -- migrate`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::Router;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fixflow_server::config::{ConfigError, ServerConfig, StoreBackend};
use fixflow_server::db::{self, MemoryStore, PgStore, Store};
use fixflow_server::services::{HostedIdentityProvider, IdentityProvider, LocalIdentityProvider};
use fixflow_server::state::AppState;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(config: &ServerConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fixflow_server=info,tower_http=debug".into());

    let json_layer = config
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!config.log_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

fn identity_provider(
    config: &ServerConfig,
) -> Result<Arc<dyn IdentityProvider>, Box<dyn std::error::Error>> {
    if let Some(identity) = &config.identity {
        tracing::info!(url = %identity.url, "Using hosted identity provider");
        return Ok(Arc::new(HostedIdentityProvider::new(identity)?));
    }

    tracing::warn!("IDENTITY_URL not set, using the in-process identity provider");
    Ok(Arc::new(LocalIdentityProvider::new()))
}

async fn build_app(config: ServerConfig) -> Result<Router, Box<dyn std::error::Error>> {
    let identity = identity_provider(&config)?;

    let app = match config.store {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .clone()
                .ok_or_else(|| ConfigError::MissingEnvVar("FIXFLOW_DATABASE_URL".to_string()))?;
            let pool = db::create_pool(&url).await?;
            tracing::info!("Database pool created");

            // The sessions table is created by `fixflow migrate`.
            let sessions = tower_sessions_sqlx_store::PostgresStore::new(pool.clone());
            let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
            fixflow_server::app(AppState::new(config, store, identity), sessions)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store, data is lost on restart");
            let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
            let sessions = tower_sessions::MemoryStore::default();
            fixflow_server::app(AppState::new(config, store, identity), sessions)
        }
    };

    // Sentry layers (outermost for full request coverage)
    Ok(app
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing(&config);

    let addr = config.socket_addr();
    let app = build_app(config).await?;

    tracing::info!("fixflow-server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
