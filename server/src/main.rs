use anyhow::Context;
use care_server::config::{Args, DbConfig, StoreKind};
use care_server::store::{CareStore, MemoryStore, PgStore};
use care_server::{app, AppState};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let addr = args.bind_addr()?;

    let store: Arc<dyn CareStore> = match args.store {
        StoreKind::Postgres => {
            let config = DbConfig::from_env()?;
            let store = PgStore::connect(&config)
                .await
                .context("failed to connect to database")?;
            if args.skip_migrations {
                tracing::warn!("skipping migrations");
            } else {
                store.migrate().await.context("failed to apply migrations")?;
            }
            Arc::new(store)
        }
        StoreKind::Memory => {
            tracing::warn!("using in-memory store, data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let app = app(AppState::new(store));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("care ward API listening on http://{addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
