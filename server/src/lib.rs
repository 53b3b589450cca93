//! Scrub HTTP service
//!
//! Wires the OCR engine, the decision pipeline and the renderer behind a small
//! JSON API. Everything blocking runs on tokio's blocking pool.

pub mod api;
pub mod config;
pub mod error;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use scrub_core::Classifier;
use scrub_ocr::OcrEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub use config::{AppConfig, ConfigError};
pub use error::ApiError;

/// Shared, immutable per-process state.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<dyn Classifier>,
    pub ocr: Arc<dyn OcrEngine>,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/api/ocr", post(api::ocr::ocr))
        .route("/api/decide", post(api::decide::decide))
        .route("/api/render", post(api::render::render))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// 运行服务直到 Ctrl+C
pub async fn serve(addr: SocketAddr, state: AppState, max_upload_bytes: usize) -> anyhow::Result<()> {
    let app = router(state, max_upload_bytes);

    let listener = TcpListener::bind(addr).await?;
    log::info!("[Server] 监听 http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("[Server] 已停止");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("[Server] 正在关闭"),
        Err(e) => {
            log::error!("[Server] 无法监听 Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
