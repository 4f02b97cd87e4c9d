use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod collection;
mod components;
mod config;
mod controllers;
mod crypto;
mod errors;
mod export;
mod extractors;
mod htmx;
mod middleware;
mod models;
mod routes;
mod service;
mod session;
mod time;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
                |_| "info,notesapp=debug,tower_http=debug".into(),
            ),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env()?;
    let service: Arc<dyn service::NotesService> = match config.backend {
        config::Backend::Http => {
            info!(api_url = %config.api_url, "using the remote notes service");
            Arc::new(service::HttpNotesService::new(&config.api_url)?)
        }
        config::Backend::Memory => {
            warn!("using the in-memory notes service; nothing is persisted");
            Arc::new(service::MemoryNotesService::new())
        }
    };
    let state = models::AppState {
        service,
        views: models::ViewStore::default(),
        session_secret: Arc::new(config.session_secret),
    };
    let app = routes::app(state);

    info!("listening on {}", config.listen_addr);
    axum::Server::bind(&config.listen_addr)
        .serve(app.into_make_service())
        .await
        .context("server exited")
}
