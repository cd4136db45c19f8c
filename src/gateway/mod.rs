//! HTTP surface: uploads, file serving, chat, health.

pub mod range;
pub mod routes;

use crate::chat::ChatOrchestrator;
use crate::config::Config;
use crate::corpus::CorpusStore;
use crate::files::{FileKind, FileStorage};
use crate::generate::{AnswerGenerator, GeminiGenerator};
use crate::search::{EvidenceSource, ScrapingFetcher};
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<FileStorage>,
    pub corpus: Arc<CorpusStore>,
    pub chat: Arc<ChatOrchestrator>,
}

impl AppState {
    pub fn new(
        storage: FileStorage,
        corpus: Arc<CorpusStore>,
        evidence: Arc<dyn EvidenceSource>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        let chat = ChatOrchestrator::new(Arc::clone(&corpus), evidence, generator);
        Self {
            storage: Arc::new(storage),
            corpus,
            chat: Arc::new(chat),
        }
    }

    /// Build production state: create upload dirs and scan existing materials.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let storage = FileStorage::new(&config.storage.uploads_dir)?;
        storage.ensure_dirs().await?;

        let evidence = Arc::new(ScrapingFetcher::new(
            config.search.search_url.clone(),
            config.search.user_agent.clone(),
        ));
        if config.generator.api_key.is_empty() {
            tracing::warn!("GEMINI_API_KEY is not set; chat requests will fail");
        }
        let generator = Arc::new(GeminiGenerator::new(
            config.generator.api_key.clone(),
            &config.generator.base_url,
            config.generator.model.clone(),
        ));

        let state = Self::new(storage, Arc::new(CorpusStore::new()), evidence, generator);
        state.load_existing_materials().await?;
        Ok(state)
    }

    /// Populate the corpus from files already in the materials directory.
    pub async fn load_existing_materials(&self) -> Result<usize> {
        let corpus = Arc::clone(&self.corpus);
        let dir = self.storage.dir(FileKind::Material);
        let loaded = tokio::task::spawn_blocking(move || corpus.load_directory(&dir))
            .await
            .context("Materials scan task failed")??;
        tracing::info!(count = loaded, "Loaded existing materials");
        Ok(loaded)
    }
}

/// Router-level knobs that are not part of handler state.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub body_limit_bytes: usize,
    pub static_dir: Option<PathBuf>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            body_limit_bytes: 100 * 1024 * 1024,
            static_dir: None,
        }
    }
}

impl RouterOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            body_limit_bytes: config.body_limit_bytes(),
            static_dir: config
                .server
                .static_dir
                .as_deref()
                .map(|d| PathBuf::from(shellexpand::tilde(d).into_owned())),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState, options: &RouterOptions) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/api/upload/video", post(routes::upload_video))
        .route("/api/upload/material", post(routes::upload_material))
        .route("/api/videos/{filename}", get(routes::stream_video))
        .route("/api/materials/{filename}", get(routes::download_material))
        .route("/api/files", get(routes::list_files))
        .route("/api/chat", post(routes::chat))
        .route("/api/health", get(routes::health_check))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(options.body_limit_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match &options.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}
