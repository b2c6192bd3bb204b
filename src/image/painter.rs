//! 肖像绘制：由 (name, mood) 构造 prompt，失败时显式循环重试

use std::sync::Arc;

use crate::image::ImageClient;

/// 肖像 prompt
pub fn portrait_prompt(name: &str, mood: &str) -> String {
    format!(
        "{}, {}, facing the camera, photo, 1950s, neo noir, hyper-realism, kodachrome",
        name, mood
    )
}

/// 带重试的肖像生成器
#[derive(Clone)]
pub struct PortraitPainter {
    client: Arc<dyn ImageClient>,
    max_attempts: u32,
}

impl PortraitPainter {
    pub fn new(client: Arc<dyn ImageClient>, max_attempts: u32) -> Self {
        Self {
            client,
            max_attempts: max_attempts.max(1),
        }
    }

    /// 生成肖像引用；重试耗尽时返回空串（肖像只是展示用，不影响合议）
    pub async fn paint(&self, name: &str, mood: &str) -> String {
        if !self.client.enabled() {
            return String::new();
        }
        let prompt = portrait_prompt(name, mood);
        for attempt in 1..=self.max_attempts {
            match self.client.generate(&prompt).await {
                Ok(reference) => return reference,
                Err(e) => {
                    tracing::warn!(juror = name, attempt, error = %e, "Portrait generation failed");
                }
            }
        }
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::image::{DisabledImageClient, ImageError};

    struct FlakyImages {
        calls: AtomicU32,
        fail_first: u32,
    }

    #[async_trait]
    impl ImageClient for FlakyImages {
        async fn generate(&self, prompt: &str) -> Result<String, ImageError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(ImageError::Prediction("NSFW filter".into()))
            } else {
                Ok(format!("https://img/{}", prompt.len()))
            }
        }
    }

    #[test]
    fn test_portrait_prompt() {
        assert_eq!(
            portrait_prompt("Yoda", "pensive"),
            "Yoda, pensive, facing the camera, photo, 1950s, neo noir, hyper-realism, kodachrome"
        );
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let client = Arc::new(FlakyImages {
            calls: AtomicU32::new(0),
            fail_first: 2,
        });
        let painter = PortraitPainter::new(client.clone(), 4);
        assert!(painter.paint("Yoda", "calm").await.starts_with("https://img/"));
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_returns_empty() {
        let client = Arc::new(FlakyImages {
            calls: AtomicU32::new(0),
            fail_first: 10,
        });
        let painter = PortraitPainter::new(client.clone(), 4);
        assert_eq!(painter.paint("Yoda", "calm").await, "");
        assert_eq!(client.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_disabled_client_skips_requests() {
        let painter = PortraitPainter::new(Arc::new(DisabledImageClient), 4);
        assert_eq!(painter.paint("Yoda", "calm").await, "");
    }
}
