use crate::config::Config;
use crate::streaming::{self, start_cleanup_task, AssetCache, ResponderSettings};
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use vidforge_av::{FormatValidator, ToolRegistry, Transcoder};

mod error;

pub use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub tools: Arc<ToolRegistry>,
    pub validator: Arc<FormatValidator>,
    pub transcoder: Arc<Transcoder>,
    pub cache: Arc<AssetCache>,
}

impl AppContext {
    /// Wire up validator, transcoder and cache from config and discovered
    /// tools.
    pub fn new(config: Config, tools: ToolRegistry) -> Self {
        let validator = FormatValidator::from_tools(&tools, config.probe.timeout());
        let transcoder =
            Transcoder::from_tools(&tools, &config.transcode, config.server.temp_dir.clone());
        let cache = AssetCache::new(&config.cache);

        Self {
            config: Arc::new(config),
            tools: Arc::new(tools),
            validator: Arc::new(validator),
            transcoder: Arc::new(transcoder),
            cache: Arc::new(cache),
        }
    }

    pub fn responder_settings(&self) -> ResponderSettings {
        ResponderSettings {
            chunk_size: self.config.streaming.chunk_size,
            cache_control: self.config.streaming.cache_control.clone(),
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([header::RANGE])
        .expose_headers([
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
            header::CONTENT_LENGTH,
            header::HeaderName::from_static("x-video-original-type"),
            header::HeaderName::from_static("x-video-metadata"),
        ]);

    Router::new()
        .route("/health", get(health_check))
        .nest("/stream", streaming::stream_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check(
    axum::extract::State(ctx): axum::extract::State<AppContext>,
) -> impl IntoResponse {
    let body = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "ffmpeg": ctx.tools.is_available("ffmpeg"),
        "ffprobe": ctx.tools.is_available("ffprobe"),
        "cache_enabled": ctx.cache.is_enabled(),
    });
    (StatusCode::OK, Json(body))
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let tools = ToolRegistry::discover(&config.tools);
    for info in tools.check_all().await {
        match (&info.version, &info.path) {
            (Some(version), Some(path)) => {
                tracing::info!("{} available at {:?}: {}", info.name, path, version)
            }
            _ => tracing::warn!("{} not available", info.name),
        }
    }

    tokio::fs::create_dir_all(&config.server.temp_dir)
        .await
        .with_context(|| format!("Failed to create temp dir {:?}", config.server.temp_dir))?;

    let ctx = AppContext::new(config, tools);
    start_cleanup_task(ctx.cache.clone(), ctx.config.cache.cleanup_interval_secs);

    tracing::info!("Serving media from {:?}", ctx.config.server.media_dir);
    tracing::debug!(
        detectors = ?ctx.validator,
        transcoder = ?ctx.transcoder,
        "Request pipeline ready"
    );

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}
