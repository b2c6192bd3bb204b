//! 图像层：陪审员肖像生成
//!
//! ImageClient 是一次请求/响应；PortraitPainter 在其上做有界重试，耗尽后返回空引用。

pub mod painter;
pub mod replicate;

use async_trait::async_trait;
use thiserror::Error;

pub use painter::{portrait_prompt, PortraitPainter};
pub use replicate::ReplicateImageClient;

/// 图像后端错误
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// 图像生成后端：prompt -> 图像引用（URL 等不透明字符串）
#[async_trait]
pub trait ImageClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ImageError>;

    /// 是否启用（Disabled 实现返回 false）
    fn enabled(&self) -> bool {
        true
    }
}

/// 未配置图像后端时使用：不发请求，返回空引用
#[derive(Debug, Clone, Default)]
pub struct DisabledImageClient;

#[async_trait]
impl ImageClient for DisabledImageClient {
    async fn generate(&self, _prompt: &str) -> Result<String, ImageError> {
        Ok(String::new())
    }

    fn enabled(&self) -> bool {
        false
    }
}
