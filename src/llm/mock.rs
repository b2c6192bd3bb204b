//! Mock LLM 客户端（用于测试与无 API Key 的本地运行）
//!
//! 优先消费预置的脚本回复；脚本为空时按 prompt 自动作答：
//! 结构化 prompt（末尾是一列 `FIELD:`）逐字段填值，其余按关键词返回固定文本，
//! 足以让一个案件从组庭一直跑到裁决。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message};

/// 自动作答时使用的案件笔录（三段证据）
pub const MOCK_TRANSCRIPT: &str = "The People v. Gerald Crumb. Gerald is accused of stealing the town's prize pumpkin.

PROSECUTOR: Mr. Crumb, where were you on the night of the fair?
CRUMB: Home, alone, carving a very ordinary pumpkin.

WITNESS: I saw a man with a wheelbarrow near the pumpkin tent.
DEFENSE: Did you see his face?
WITNESS: No, but he was humming.";

/// Mock 客户端：脚本回复 + 自动作答
#[derive(Debug)]
pub struct MockLlmClient {
    scripted: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
    guilty_percent: u32,
    innocent_percent: u32,
    eagerness: u32,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            guilty_percent: 90,
            innocent_percent: 5,
            eagerness: 50,
        }
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 自动作答时报告的有罪/无罪把握
    pub fn with_percentages(mut self, guilty: u32, innocent: u32) -> Self {
        self.guilty_percent = guilty;
        self.innocent_percent = innocent;
        self
    }

    pub fn with_eagerness(mut self, eagerness: u32) -> Self {
        self.eagerness = eagerness;
        self
    }

    /// 追加一条脚本回复（按 FIFO 消费）
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.lock_script().push_back(Ok(reply.into()));
    }

    /// 追加一次后端失败
    pub fn push_failure(&self, err: LlmError) {
        self.lock_script().push_back(Err(err));
    }

    /// 已收到的全部 prompt（按调用顺序）
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, LlmError>>> {
        self.scripted.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn auto_reply(&self, prompt: &str) -> String {
        let fields = trailing_fields(prompt);
        if !fields.is_empty() {
            return fields
                .iter()
                .map(|name| format!("{}: {}", name, self.field_value(name)))
                .collect::<Vec<_>>()
                .join("\n\n");
        }

        let lower = prompt.to_lowercase();
        if lower.contains("court transcript") {
            MOCK_TRANSCRIPT.to_string()
        } else if lower.contains("chairman of the jury") {
            "The jury weighed the pumpkin evidence carefully and returns the verdict: Guilty"
                .to_string()
        } else if lower.contains("current mood?") {
            "Curious".to_string()
        } else if lower.contains("one or two words") {
            "Seems trustworthy".to_string()
        } else {
            "\"The wheelbarrow tells us everything we need to know.\"".to_string()
        }
    }

    fn field_value(&self, name: &str) -> String {
        match name {
            "GUILTY_PERCENT" => format!("{}%", self.guilty_percent),
            "INNOCENT_PERCENT" => format!("{}%", self.innocent_percent),
            "SPEAK_EAGERNESS" => format!("{}%", self.eagerness),
            "MOOD" => "Resolute".to_string(),
            "SUMMARY" => "- A pumpkin went missing during the fair.".to_string(),
            "BELIEFS" => "- The humming man with the wheelbarrow matters.".to_string(),
            n if n.starts_with("OPINION_ABOUT_") => "Makes a fair point.".to_string(),
            _ => "Noted.".to_string(),
        }
    }
}

/// 提取 prompt 末尾连续的 `FIELD:` 行（空行跳过），按出现顺序返回字段名
pub fn trailing_fields(prompt: &str) -> Vec<String> {
    let mut fields = Vec::new();
    for line in prompt.trim_end().lines().rev() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.strip_suffix(':') {
            Some(name)
                if !name.is_empty()
                    && name
                        .chars()
                        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') =>
            {
                fields.push(name.to_string())
            }
            _ => break,
        }
    }
    fields.reverse();
    fields
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let prompt = messages
            .iter()
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();

        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.clone());

        if let Some(scripted) = self.lock_script().pop_front() {
            return scripted;
        }
        Ok(self.auto_reply(&prompt))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_fields() {
        let prompt = "Describe yourself.\n* Homer Simpson: lazy\n\nMOOD:\n\nBELIEFS:\n\nGUILTY_PERCENT:\n";
        assert_eq!(trailing_fields(prompt), vec!["MOOD", "BELIEFS", "GUILTY_PERCENT"]);
        assert!(trailing_fields("Say something nice.").is_empty());
    }

    #[tokio::test]
    async fn test_scripted_replies_come_first() {
        let mock = MockLlmClient::new();
        mock.push_reply("first");
        mock.push_failure(LlmError::Network("down".into()));

        let msgs = [Message::user("MOOD:")];
        assert_eq!(mock.complete(&msgs).await.unwrap(), "first");
        assert!(mock.complete(&msgs).await.is_err());
        assert_eq!(mock.complete(&msgs).await.unwrap(), "MOOD: Resolute");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_auto_reply_fills_percentages() {
        let mock = MockLlmClient::new().with_percentages(10, 80);
        let reply = mock
            .complete(&[Message::user("How sure?\n\nGUILTY_PERCENT:\n\nINNOCENT_PERCENT:")])
            .await
            .unwrap();
        assert_eq!(reply, "GUILTY_PERCENT: 10%\n\nINNOCENT_PERCENT: 80%");
    }
}
