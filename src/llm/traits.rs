//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient：complete（非流式）。
//! 重试与「AI 免责声明」过滤不在这里，由 TextGenerator 统一处理。

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::Message;

/// 后端调用错误（网络层或 API 返回错误；限流由 async-openai 自行退避）
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    ApiError(String),

    /// 重试预算耗尽，携带最后一次错误
    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<LlmError> },
}

/// LLM 客户端 trait：给定消息序列返回生成文本
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 后端名称（用于日志）
    fn name(&self) -> &str {
        "llm"
    }
}
