//! 编排层错误类型
//!
//! 解析失败不是错误（由陪审员行为的回退吸收），存储错误只记日志；这里只收拢会终止房间任务的失败。

use thiserror::Error;

use crate::llm::LlmError;

/// 房间编排过程中可能出现的错误
#[derive(Error, Debug)]
pub enum JuryError {
    /// 后端重试耗尽；当前批次作废、不持久化
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// 并发任务 panic 或被取消
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Unknown court room: {0}")]
    UnknownRoom(String),

    #[error("Invalid roster for room {room}: {reason}")]
    InvalidRoster { room: String, reason: String },
}
