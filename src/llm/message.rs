//! 发往 LLM 的消息

use serde::{Deserialize, Serialize};

/// 单条 user 消息；所有请求都是单轮、无 system 提示
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}
