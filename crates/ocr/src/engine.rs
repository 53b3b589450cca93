//! OCR 引擎 trait

use crate::error::OcrError;
use image::DynamicImage;
use scrub_core::Token;
use serde::Serialize;

/// 引擎安装状态
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub engine: String,
    pub installed: bool,
    pub version: Option<String>,
    pub error: Option<String>,
}

/// OCR 引擎通用接口
///
/// 按阅读顺序返回 token，bbox 为像素坐标，置信度范围 0-100。
/// 空白或无法识别的图像返回空列表。
pub trait OcrEngine: Send + Sync {
    fn recognize_image(&self, img: &DynamicImage) -> Result<Vec<Token>, OcrError>;

    /// 解码 `bytes`（支持 `image` crate 的所有格式）后识别
    fn recognize_bytes(&self, bytes: &[u8]) -> Result<Vec<Token>, OcrError> {
        let img = image::load_from_memory(bytes)?;
        self.recognize_image(&img)
    }

    fn status(&self) -> EngineStatus;
}
