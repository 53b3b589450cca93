//! OCR 错误类型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("图像解码失败: {0}")]
    Image(#[from] image::ImageError),

    #[error("OCR 引擎不可用: {0}")]
    EngineUnavailable(String),

    #[error("OCR 识别失败: {0}")]
    Engine(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}
