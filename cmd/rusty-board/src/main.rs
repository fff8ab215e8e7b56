//! # Rusty-Board Binary
//!
//! The entry point that assembles the application from configuration and
//! compile-time features.

mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use api_adapters::{AppState, AskamaRenderer, BoardMetrics, LocalMedia};
use auth_adapters::SharedSecretGate;
use configs::{MediaBackend, MediaSettings, Settings};
use domains::AttachmentStore;
use secrecy::ExposeSecret;
use services::BoardService;
use storage_adapters::{MemoryAttachmentStore, UrlSigner};
use tokio::net::TcpListener;

#[cfg(feature = "db-sqlite")]
use storage_adapters::SqliteBoardRepo;

#[cfg(not(feature = "db-sqlite"))]
compile_error!("rusty-board needs a relational store; enable the `db-sqlite` feature");

/// The attachment store plus, for stores without URLs of their own, what
/// the `/media` route needs to serve them.
struct Media {
    store: Arc<dyn AttachmentStore>,
    local: Option<LocalMedia>,
}

async fn build_media(settings: &MediaSettings) -> anyhow::Result<Media> {
    let signer = || {
        Arc::new(UrlSigner::new(
            settings.signing_key.expose_secret().as_bytes(),
            settings.public_base_url.clone(),
        ))
    };

    match settings.backend {
        MediaBackend::Memory => {
            tracing::warn!("attachments are kept in memory and lost on restart");
            let signer = signer();
            let store: Arc<dyn AttachmentStore> =
                Arc::new(MemoryAttachmentStore::new(signer.clone()));
            Ok(Media {
                store: store.clone(),
                local: Some(LocalMedia { signer, store }),
            })
        }
        #[cfg(feature = "media-local")]
        MediaBackend::Local => {
            tracing::info!(root = %settings.local_root.display(), "attachments on local disk");
            let signer = signer();
            let store: Arc<dyn AttachmentStore> = Arc::new(
                storage_adapters::LocalAttachmentStore::new(
                    settings.local_root.clone(),
                    signer.clone(),
                ),
            );
            Ok(Media {
                store: store.clone(),
                local: Some(LocalMedia { signer, store }),
            })
        }
        #[cfg(feature = "media-s3")]
        MediaBackend::S3 => {
            let bucket = settings
                .s3
                .bucket
                .clone()
                .context("media.s3.bucket is not set")?;
            tracing::info!(%bucket, region = %settings.s3.region, "attachments in S3");
            let store = storage_adapters::S3AttachmentStore::connect(
                bucket,
                settings.s3.region.clone(),
                settings.s3.endpoint.clone(),
            )
            .await;
            Ok(Media {
                store: Arc::new(store),
                local: None,
            })
        }
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("media backend {other:?} is not compiled into this binary"),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    telemetry::init(&settings.logging);

    // 1. Relational store (also hands out post numbers)
    let repo = Arc::new(
        SqliteBoardRepo::new(&settings.database.url, settings.database.max_connections)
            .await
            .context("failed to open the database")?,
    );

    // 2. Attachment store
    let media = build_media(&settings.media).await?;

    // 3. Wire the service and the web layer
    let board = BoardService::new(
        repo.clone(),
        repo,
        media.store,
        settings.media.url_ttl(),
    );
    let state = AppState {
        board: Arc::new(board),
        renderer: Arc::new(AskamaRenderer),
        gate: Arc::new(SharedSecretGate::new(&settings.auth.password)),
        metrics: Arc::new(BoardMetrics::new()),
        media: media.local,
    };
    let app = api_adapters::router(state, settings.media.max_upload_bytes);

    let addr = settings.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("rusty-board listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}
