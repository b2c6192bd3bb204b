//! 文本生成：在 LlmClient 之上加有界重试
//!
//! 两类重试各自计数：
//! - 后端错误（网络 / 限流 / API）：最多 `backend_attempts` 次，耗尽后返回 `LlmError::Exhausted`
//! - 「作为 AI / language model」之类的自我指涉回复：最多 `disclaimer_attempts` 次，耗尽后返回空串

use std::sync::Arc;
use std::time::Duration;

use crate::llm::{LlmClient, LlmError, Message};

/// 重试预算
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub backend_attempts: u32,
    pub disclaimer_attempts: u32,
    /// 后端错误重试的基础等待（按失败次数线性放大）
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backend_attempts: 4,
            disclaimer_attempts: 6,
            backoff: Duration::from_millis(500),
        }
    }
}

/// 回复是否为需要丢弃的自我指涉（"As an AI ..." / "language model"）
pub fn is_disclaimer(output: &str) -> bool {
    output.contains(" AI ") || output.to_lowercase().contains("language model")
}

/// 带重试的文本生成器，可在多个并发任务间共享（Arc）
#[derive(Clone)]
pub struct TextGenerator {
    client: Arc<dyn LlmClient>,
    policy: RetryPolicy,
}

impl TextGenerator {
    pub fn new(client: Arc<dyn LlmClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 以单条 user 消息请求生成，返回去除首尾空白的文本
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let messages = [Message::user(prompt)];
        let mut failures = 0u32;
        let mut rejections = 0u32;

        loop {
            match self.client.complete(&messages).await {
                Ok(output) => {
                    let output = output.trim();
                    if !is_disclaimer(output) {
                        return Ok(output.to_string());
                    }
                    rejections += 1;
                    if rejections >= self.policy.disclaimer_attempts {
                        tracing::warn!(
                            backend = self.client.name(),
                            attempts = rejections,
                            "Backend kept answering as an AI, giving up with empty text"
                        );
                        return Ok(String::new());
                    }
                    tracing::debug!(backend = self.client.name(), "Rejected self-referential reply");
                }
                Err(err) => {
                    failures += 1;
                    if failures >= self.policy.backend_attempts {
                        tracing::error!(
                            backend = self.client.name(),
                            attempts = failures,
                            error = %err,
                            "Text generation failed"
                        );
                        return Err(LlmError::Exhausted {
                            attempts: failures,
                            last: Box::new(err),
                        });
                    }
                    let delay = self.policy.backoff * failures;
                    tracing::warn!(
                        backend = self.client.name(),
                        attempt = failures,
                        error = %err,
                        "Text generation failed, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    fn generator(mock: Arc<MockLlmClient>) -> TextGenerator {
        TextGenerator::new(
            mock,
            RetryPolicy {
                backend_attempts: 4,
                disclaimer_attempts: 3,
                backoff: Duration::ZERO,
            },
        )
    }

    #[test]
    fn test_is_disclaimer() {
        assert!(is_disclaimer("As an AI language model, I cannot judge."));
        assert!(is_disclaimer("I am just an AI model"));
        assert!(!is_disclaimer("AI is overrated, the defendant is guilty."));
        assert!(!is_disclaimer("Guilty as charged."));
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_failure(LlmError::Network("reset".into()));
        mock.push_failure(LlmError::ApiError("502".into()));
        mock.push_reply("  Hello there  ");

        let out = generator(mock.clone()).generate("Say hello").await.unwrap();
        assert_eq!(out, "Hello there");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_backend_failures_exhaust() {
        let mock = Arc::new(MockLlmClient::new());
        for _ in 0..4 {
            mock.push_failure(LlmError::Network("down".into()));
        }
        let err = generator(mock.clone()).generate("Say hello").await.unwrap_err();
        assert!(matches!(err, LlmError::Exhausted { attempts: 4, .. }));
        assert_eq!(mock.call_count(), 4);
    }

    #[tokio::test]
    async fn test_disclaimers_fall_back_to_empty() {
        let mock = Arc::new(MockLlmClient::new());
        for _ in 0..3 {
            mock.push_reply("As a language model I refuse.");
        }
        mock.push_reply("never reached");
        let out = generator(mock.clone()).generate("Judge").await.unwrap();
        assert_eq!(out, "");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_disclaimer_then_real_answer() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_reply("As an AI I cannot");
        mock.push_reply("Guilty.");
        let out = generator(mock).generate("Judge").await.unwrap();
        assert_eq!(out, "Guilty.");
    }
}
