use anyhow::Context;
use env_logger::Env;
use scrub_gemini::GeminiClassifier;
use scrub_ocr::TesseractEngine;
use scrub_server::{serve, AppConfig, AppState};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let addr = config.bind_addr()?;

    if !config.gemini.has_api_key() {
        log::warn!(
            "[Server] 未设置 {}，/api/decide 将返回 500",
            scrub_gemini::API_KEY_VAR
        );
    }

    // 阻塞 HTTP 客户端必须在异步运行时之外创建
    let classifier =
        GeminiClassifier::new(config.gemini.clone()).context("failed to create Gemini classifier")?;
    let state = AppState {
        classifier: Arc::new(classifier),
        ocr: Arc::new(TesseractEngine::new(config.tesseract.clone())),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    let result = runtime.block_on(serve(addr, state.clone(), config.server.max_upload_bytes));

    // 先释放运行时，再释放阻塞客户端
    drop(runtime);
    drop(state);
    result
}
