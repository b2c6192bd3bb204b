//! Replicate 预测 API 客户端
//!
//! POST /predictions（带 `Prefer: wait`），若返回时尚未完成则轮询 `urls.get`；
//! 成功时取 output 数组的第一个 URL 作为肖像引用。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::image::{ImageClient, ImageError};

pub const REPLICATE_API_BASE: &str = "https://api.replicate.com/v1";

/// 轮询未完成预测的最大次数
const MAX_POLLS: u32 = 30;
const POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct ReplicateImageClient {
    client: Client,
    api_base: String,
    token: String,
    model_version: String,
    width: u32,
    height: u32,
}

impl ReplicateImageClient {
    pub fn new(
        api_base: Option<&str>,
        token: impl Into<String>,
        model_version: impl Into<String>,
        width: u32,
        height: u32,
        timeout_secs: u64,
    ) -> Result<Self, ImageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base
                .unwrap_or(REPLICATE_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            token: token.into(),
            model_version: model_version.into(),
            width,
            height,
        })
    }

    async fn poll(&self, url: &str) -> Result<Value, ImageError> {
        let body = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(body)
    }
}

/// 从预测结果中取出图像引用；未完成返回 Ok(None)
fn extract_output(prediction: &Value) -> Result<Option<String>, ImageError> {
    match prediction["status"].as_str() {
        Some("succeeded") => {
            let output = &prediction["output"];
            let first = output
                .as_array()
                .and_then(|items| items.first())
                .unwrap_or(output);
            first
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| ImageError::UnexpectedResponse(output.to_string()))
        }
        Some("failed") | Some("canceled") => Err(ImageError::Prediction(
            prediction["error"].as_str().unwrap_or("unknown error").to_string(),
        )),
        Some(_) => Ok(None),
        None => Err(ImageError::UnexpectedResponse(prediction.to_string())),
    }
}

#[async_trait]
impl ImageClient for ReplicateImageClient {
    async fn generate(&self, prompt: &str) -> Result<String, ImageError> {
        let body = json!({
            "version": self.model_version,
            "input": {
                "prompt": prompt,
                "width": self.width,
                "height": self.height,
            }
        });

        let mut prediction = self
            .client
            .post(format!("{}/predictions", self.api_base))
            .bearer_auth(&self.token)
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        for _ in 0..MAX_POLLS {
            if let Some(reference) = extract_output(&prediction)? {
                return Ok(reference);
            }
            let url = prediction["urls"]["get"]
                .as_str()
                .ok_or_else(|| ImageError::UnexpectedResponse(prediction.to_string()))?
                .to_string();
            tokio::time::sleep(POLL_INTERVAL).await;
            prediction = self.poll(&url).await?;
        }

        Err(ImageError::Prediction("prediction did not finish in time".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_output_succeeded() {
        let p = json!({"status": "succeeded", "output": ["https://a/1.png", "https://a/2.png"]});
        assert_eq!(extract_output(&p).unwrap().as_deref(), Some("https://a/1.png"));

        let p = json!({"status": "succeeded", "output": "https://a/single.png"});
        assert_eq!(extract_output(&p).unwrap().as_deref(), Some("https://a/single.png"));
    }

    #[test]
    fn test_extract_output_pending_and_failed() {
        let p = json!({"status": "processing", "urls": {"get": "https://x"}});
        assert!(extract_output(&p).unwrap().is_none());

        let p = json!({"status": "failed", "error": "NSFW content detected"});
        assert!(matches!(extract_output(&p), Err(ImageError::Prediction(msg)) if msg.contains("NSFW")));

        assert!(extract_output(&json!({"detail": "Unauthenticated"})).is_err());
    }
}
