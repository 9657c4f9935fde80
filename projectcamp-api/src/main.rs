//! # Project Camp API Server
//!
//! Loads configuration, connects to PostgreSQL, applies migrations, selects
//! the media store and serves the API until Ctrl-C or SIGTERM.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p projectcamp-api
//! ```

use std::sync::Arc;

use anyhow::Context;
use projectcamp_api::{
    app::{build_router, AppState},
    config::Config,
};
use projectcamp_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    media::{
        cloudinary::{CloudinaryConfig, CloudinaryStore},
        MediaStore, UnconfiguredMediaStore,
    },
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "projectcamp_api=debug,projectcamp_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Project Camp API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("Failed to connect to the database")?;

    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let media: Arc<dyn MediaStore> = match &config.media {
        Some(media) => {
            let mut cloudinary = CloudinaryConfig::new(
                media.cloud_name.clone(),
                media.api_key.clone(),
                media.api_secret.clone(),
            );
            cloudinary.signature_algorithm = media.signature_algorithm;
            Arc::new(
                CloudinaryStore::new(cloudinary).context("Failed to configure the media store")?,
            )
        }
        None => {
            tracing::warn!("Media host credentials missing, attachment uploads will fail");
            Arc::new(UnconfiguredMediaStore)
        }
    };

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config, media));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received, draining connections...");
}
