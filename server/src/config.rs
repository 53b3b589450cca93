use scrub_gemini::GeminiConfig;
use scrub_ocr::TesseractConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

pub const CONFIG_PATH_VAR: &str = "SCRUB_CONFIG";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    pub tesseract: TesseractConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub bind_addr: String,
    /// 图片上传的请求体大小上限
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{var} 的值无效: {value:?}")]
    InvalidValue { var: &'static str, value: String },
    #[error("监听地址无效: {0:?}")]
    InvalidAddr(String),
}

impl AppConfig {
    /// 读取 `SCRUB_CONFIG` 指定的 JSON 配置文件（可选），再应用环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|var| std::env::var(var).ok())
    }

    /// 同 [`AppConfig::load`]，环境变量查找可注入
    pub fn load_from<F>(env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match env(CONFIG_PATH_VAR).filter(|p| !p.trim().is_empty()) {
            Some(path) => {
                log::info!("[Config] 加载配置文件: {}", path);
                Self::from_file(Path::new(&path))?
            }
            None => Self::default(),
        };
        config.apply_env(&env)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn apply_env<F>(&mut self, env: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| env(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // ============ Gemini ============
        if let Some(key) = get(scrub_gemini::API_KEY_VAR) {
            self.gemini.api_key = Some(key);
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Some(endpoint) = get("GEMINI_ENDPOINT") {
            self.gemini.endpoint = endpoint;
        }
        if let Some(v) = get("SCRUB_CLASSIFIER_TIMEOUT_SECS") {
            self.gemini.timeout_secs = parse_var("SCRUB_CLASSIFIER_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = get("SCRUB_MAX_OUTPUT_TOKENS") {
            self.gemini.max_output_tokens = parse_var("SCRUB_MAX_OUTPUT_TOKENS", v)?;
        }

        // ============ Server ============
        if let Some(addr) = get("SCRUB_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(v) = get("SCRUB_MAX_UPLOAD_BYTES") {
            self.server.max_upload_bytes = parse_var("SCRUB_MAX_UPLOAD_BYTES", v)?;
        }

        // ============ Tesseract ============
        if let Some(bin) = get("TESSERACT_BIN") {
            self.tesseract.binary_path = Some(bin);
        }
        if let Some(dir) = get("TESSDATA_PREFIX") {
            self.tesseract.tessdata_path = Some(dir);
        }
        if let Some(lang) = get("SCRUB_OCR_LANG") {
            self.tesseract.lang = Some(lang);
        }
        if let Some(v) = get("SCRUB_OCR_PSM") {
            self.tesseract.psm = Some(parse_var("SCRUB_OCR_PSM", v)?);
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidAddr(self.server.bind_addr.clone()))
    }
}

fn parse_var<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue { var, value })
}
