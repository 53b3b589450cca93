//! Tesseract OCR 引擎（命令行封装）

use image::{DynamicImage, ImageError, ImageFormat};
use scrub_core::{BBox, Token};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

use crate::engine::{EngineStatus, OcrEngine};
use crate::error::OcrError;

const DEFAULT_BINARY: &str = "tesseract";
const DEFAULT_LANG: &str = "eng";
/// 稀疏文本，不做版面分析
const DEFAULT_PSM: u8 = 11;

/// TSV 输出中的单词级别
const WORD_LEVEL: i32 = 5;

/// Tesseract 配置
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TesseractConfig {
    /// tesseract 可执行文件路径
    pub binary_path: Option<String>,
    /// tessdata 目录，通过 TESSDATA_PREFIX 传入
    pub tessdata_path: Option<String>,
    /// 识别语言，如 "eng" 或 "eng+deu"
    pub lang: Option<String>,
    /// 页面分割模式 (0-13)
    pub psm: Option<u8>,
    /// OCR 引擎模式 (0-3)，未设置时由 tesseract 决定
    pub oem: Option<u8>,
}

impl TesseractConfig {
    pub fn binary_or_default(&self) -> &str {
        self.binary_path.as_deref().unwrap_or(DEFAULT_BINARY)
    }

    pub fn lang_or_default(&self) -> &str {
        self.lang.as_deref().unwrap_or(DEFAULT_LANG)
    }

    pub fn psm_or_default(&self) -> u8 {
        self.psm.unwrap_or(DEFAULT_PSM)
    }
}

/// Tesseract OCR 引擎
pub struct TesseractEngine {
    config: TesseractConfig,
}

impl TesseractEngine {
    /// 创建 Tesseract 引擎
    ///
    /// 首次使用时才调用可执行文件，未安装只影响 OCR 请求。
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TesseractConfig {
        &self.config
    }

    /// 对图像文件运行 tesseract 并解析 TSV 输出
    pub fn recognize_file(&self, image_path: &Path) -> Result<Vec<Token>, OcrError> {
        let start = Instant::now();

        let mut cmd = Command::new(self.config.binary_or_default());
        cmd.arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(self.config.lang_or_default())
            .arg("--psm")
            .arg(self.config.psm_or_default().to_string());

        if let Some(oem) = self.config.oem {
            cmd.arg("--oem").arg(oem.to_string());
        }
        cmd.arg("tsv");

        if let Some(tessdata_path) = &self.config.tessdata_path {
            cmd.env("TESSDATA_PREFIX", tessdata_path);
        }

        log::info!(
            "[Tesseract] 执行: {} {} -l {} --psm {} tsv",
            self.config.binary_or_default(),
            image_path.display(),
            self.config.lang_or_default(),
            self.config.psm_or_default()
        );

        let output = cmd.output().map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(stderr.trim().to_string()));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let tokens = parse_tesseract_tsv(&tsv);

        log::info!(
            "[Tesseract] 识别完成，耗时 {} ms，共 {} 个词",
            start.elapsed().as_millis(),
            tokens.len()
        );
        Ok(tokens)
    }

    fn spawn_error(&self, err: std::io::Error) -> OcrError {
        if err.kind() == ErrorKind::NotFound {
            OcrError::EngineUnavailable(format!(
                "'{}' not found; install tesseract or set TESSERACT_BIN",
                self.config.binary_or_default()
            ))
        } else {
            OcrError::Io(err)
        }
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize_image(&self, img: &DynamicImage) -> Result<Vec<Token>, OcrError> {
        let input = tempfile::Builder::new()
            .prefix("scrub-ocr-")
            .suffix(".png")
            .tempfile()?;

        img.save_with_format(input.path(), ImageFormat::Png)
            .map_err(temp_write_error)?;

        // `input` 析构时删除临时文件
        self.recognize_file(input.path())
    }

    fn status(&self) -> EngineStatus {
        match get_tesseract_version(self.config.binary_or_default()) {
            Ok(version) => EngineStatus {
                engine: "tesseract".to_string(),
                installed: true,
                version: Some(version),
                error: None,
            },
            Err(e) => EngineStatus {
                engine: "tesseract".to_string(),
                installed: false,
                version: None,
                error: Some(e),
            },
        }
    }
}

/// 临时文件写入失败属于服务端错误，不归为输入图像错误
fn temp_write_error(err: ImageError) -> OcrError {
    match err {
        ImageError::IoError(e) => OcrError::Io(e),
        other => OcrError::Engine(format!("failed to write temporary image: {}", other)),
    }
}

/// 解析 Tesseract TSV 输出
///
/// TSV 格式：
/// level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
///
/// 只保留有文本且置信度非负的单词级行（level 5），每个词有独立的 bbox
pub fn parse_tesseract_tsv(tsv: &str) -> Vec<Token> {
    let mut tokens = Vec::new();

    // 跳过表头
    for line in tsv.lines().skip(1) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }

        let level: i32 = cols[0].trim().parse().unwrap_or(-1);
        let left: f32 = cols[6].trim().parse().unwrap_or(0.0);
        let top: f32 = cols[7].trim().parse().unwrap_or(0.0);
        let width: f32 = cols[8].trim().parse().unwrap_or(0.0);
        let height: f32 = cols[9].trim().parse().unwrap_or(0.0);
        let conf: f32 = cols[10].trim().parse().unwrap_or(-1.0);
        let text = cols[11].trim();

        if level != WORD_LEVEL || text.is_empty() || conf < 0.0 {
            continue;
        }

        tokens.push(Token::new(
            text,
            conf,
            BBox::from_origin_size(left, top, width, height),
        ));
    }

    tokens
}

/// 获取 Tesseract 版本
pub fn get_tesseract_version(binary_path: &str) -> Result<String, String> {
    let output = Command::new(binary_path)
        .arg("--version")
        .output()
        .map_err(|e| format!("cannot run {}: {}", binary_path, e))?;

    if !output.status.success() {
        return Err(format!("{} --version failed", binary_path));
    }

    // 旧版本把版本号输出到 stderr
    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(parse_version(&combined).unwrap_or_else(|| "unknown".to_string()))
}

/// 从 "tesseract 5.3.0" 或 "tesseract v5.3.0" 中提取 "5.3.0"
fn parse_version(output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.contains("tesseract"))
        .and_then(|line| line.split_whitespace().nth(1))
        .map(|v| v.trim_start_matches('v').to_string())
}
