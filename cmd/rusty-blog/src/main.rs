//! # Rusty-Blog Binary
//!
//! Assembles the thread service from settings and compile-time features.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api_adapters::AppState;
use auth_adapters::JwtAuthProvider;
use configs::{LogSettings, Settings, StorageBackend};
use domains::{BlogRegistry, ThreadRepository, UserDirectory};
use services::ThreadService;
use storage_adapters::InMemoryStore;

#[cfg(feature = "db-sqlite")]
use storage_adapters::SqliteStore;

type Ports = (
    Arc<dyn ThreadRepository>,
    Arc<dyn BlogRegistry>,
    Arc<dyn UserDirectory>,
);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings.log)?;

    // 1. Storage
    let (threads, blogs, users) = open_storage(&settings).await?;

    // 2. Auth
    let auth = Arc::new(JwtAuthProvider::new(
        &settings.auth.jwt_secret,
        settings.auth.token_ttl_secs,
    ));

    // 3. Service and routes
    let service = ThreadService::new(threads, blogs, users);
    let app = api_adapters::router(AppState::new(service, auth), &settings.server.cors_origins);

    let address = settings.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, backend = ?settings.database.backend, "rusty-blog listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("rusty-blog stopped");
    Ok(())
}

/// `RUST_LOG`, when set, replaces the configured filter.
fn init_tracing(log: &LogSettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.filter))
        .context("parsing log filter")?;

    let (json, pretty) = if log.json {
        (Some(fmt::layer().json().with_current_span(true)), None)
    } else {
        (None, Some(fmt::layer().compact()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .try_init()
        .context("installing tracing subscriber")
}

async fn open_storage(settings: &Settings) -> anyhow::Result<Ports> {
    match settings.database.backend {
        StorageBackend::Memory => {
            warn!("using the in-memory store; data is lost on exit");
            let store = Arc::new(InMemoryStore::new());
            let threads: Arc<dyn ThreadRepository> = store.clone();
            let blogs: Arc<dyn BlogRegistry> = store.clone();
            let users: Arc<dyn UserDirectory> = store;
            Ok((threads, blogs, users))
        }
        #[cfg(feature = "db-sqlite")]
        StorageBackend::Sqlite => {
            let store = Arc::new(
                SqliteStore::connect(&settings.database.url, settings.database.max_connections)
                    .await
                    .context("opening the SQLite store")?,
            );
            let threads: Arc<dyn ThreadRepository> = store.clone();
            let blogs: Arc<dyn BlogRegistry> = store.clone();
            let users: Arc<dyn UserDirectory> = store;
            Ok((threads, blogs, users))
        }
        #[cfg(not(feature = "db-sqlite"))]
        StorageBackend::Sqlite => anyhow::bail!("built without the db-sqlite feature"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
