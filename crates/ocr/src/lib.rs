//! OCR 引擎
//!
//! 输出单词级 token，每个 token 带像素坐标的 bbox

pub mod engine;
pub mod error;
pub mod tesseract;

pub use engine::{EngineStatus, OcrEngine};
pub use error::OcrError;
pub use tesseract::{get_tesseract_version, parse_tesseract_tsv, TesseractConfig, TesseractEngine};
