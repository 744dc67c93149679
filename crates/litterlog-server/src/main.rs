use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use litterlog_db::Database;
use litterlog_server::storage::PhotoStore;
use litterlog_server::{AppState, prune, router};

/// Fallback secret for local development. Anything real must override it.
const PLACEHOLDER_SECRET: &str = "dev-secret-change-me";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "litterlog=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let host = std::env::var("LITTERLOG_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("LITTERLOG_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let db_path: PathBuf = std::env::var("LITTERLOG_DB_PATH")
        .unwrap_or_else(|_| "litterlog.db".into())
        .into();
    let upload_dir: PathBuf = std::env::var("LITTERLOG_UPLOAD_DIR")
        .unwrap_or_else(|_| "./uploads".into())
        .into();
    let public_dir: PathBuf = std::env::var("LITTERLOG_PUBLIC_DIR")
        .unwrap_or_else(|_| "./public".into())
        .into();
    let session_secret =
        std::env::var("LITTERLOG_SESSION_SECRET").unwrap_or_else(|_| PLACEHOLDER_SECRET.into());
    if session_secret == PLACEHOLDER_SECRET {
        warn!("LITTERLOG_SESSION_SECRET is unset; session cookies use the insecure default");
    }

    // Init DB and photo storage
    let db = Arc::new(Database::open(&db_path)?);
    let photos = Arc::new(PhotoStore::new(upload_dir).await?);

    // Background prune of expired sessions (runs every hour)
    tokio::spawn(prune::run_session_prune_loop(db.clone(), 3600));

    let state = AppState { db, photos, session_secret };
    let app = router(state, public_dir);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("litterlog listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
