//! Courtroom 构建器：按配置装配后端、名单与存储
//!
//! 后端选择与 `create_llm_from_config` 一致：有 DeepSeek Key 走 DeepSeek，其次 OpenAI，都没有则用 Mock。

use std::sync::Arc;
use std::time::Duration;

use crate::config::{read_example_transcripts, AppConfig};
use crate::core::{Courtroom, JuryError};
use crate::image::{DisabledImageClient, ImageClient, PortraitPainter, ReplicateImageClient};
use crate::jury::{canonical_room, resolve_roster, JurorContext};
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient, TextGenerator};
use crate::storage::{create_case_store, CaseStore};

/// 后端用途：陪审员（高温度）或叙述（笔录、裁决总结）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendRole {
    Juror,
    Narrative,
}

/// 根据配置与环境变量选择 LLM 后端
pub fn create_llm_from_config(cfg: &AppConfig, role: BackendRole) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    // 有 DeepSeek Key 或（配置为 deepseek 且仅有 OpenAI Key 时也走 DeepSeek 兼容端点）
    let use_deepseek = std::env::var("DEEPSEEK_API_KEY").is_ok()
        || (provider == "deepseek" && std::env::var("OPENAI_API_KEY").is_ok());
    let use_openai = std::env::var("OPENAI_API_KEY").is_ok() && provider != "deepseek";

    let (temperature, model_override) = match role {
        BackendRole::Juror => (cfg.llm.temperature, None),
        BackendRole::Narrative => (cfg.llm.narrative_temperature, cfg.llm.narrative_model.clone()),
    };

    if use_deepseek {
        let model = model_override
            .or_else(|| cfg.llm.deepseek.model.clone())
            .unwrap_or_else(|| cfg.llm.model.clone());
        tracing::info!(role = ?role, "Using DeepSeek LLM ({})", model);
        Arc::new(create_deepseek_client(Some(&model)).with_temperature(temperature))
    } else if use_openai {
        let model = model_override
            .or_else(|| cfg.llm.openai.model.clone())
            .unwrap_or_else(|| "gpt-4o-mini".to_string());
        tracing::info!(role = ?role, "Using OpenAI LLM ({})", model);
        Arc::new(
            OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &model,
                std::env::var("OPENAI_API_KEY").ok().as_deref(),
            )
            .with_temperature(temperature),
        )
    } else {
        tracing::warn!(role = ?role, "No API key set or provider unknown, using Mock LLM");
        Arc::new(MockLlmClient::new())
    }
}

/// 肖像后端；未配置 provider / token / 模型版本时禁用
pub fn create_image_client(cfg: &AppConfig) -> Arc<dyn ImageClient> {
    if cfg.image.provider.eq_ignore_ascii_case("none") {
        return Arc::new(DisabledImageClient);
    }
    let Ok(token) = std::env::var("REPLICATE_API_TOKEN") else {
        tracing::info!("REPLICATE_API_TOKEN not set, portraits disabled");
        return Arc::new(DisabledImageClient);
    };
    let Some(version) = cfg.image.model_version.as_deref() else {
        tracing::warn!("image.model_version not configured, portraits disabled");
        return Arc::new(DisabledImageClient);
    };
    match ReplicateImageClient::new(
        cfg.image.api_base.as_deref(),
        token,
        version,
        cfg.image.width,
        cfg.image.height,
        cfg.image.timeout_secs,
    ) {
        Ok(client) => {
            tracing::info!(model_version = version, "Using Replicate for portraits");
            Arc::new(client)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to build image client, portraits disabled");
            Arc::new(DisabledImageClient)
        }
    }
}

/// Courtroom 构建器：未显式注入的组件按配置创建
pub struct CourtroomBuilder {
    room: String,
    config: AppConfig,
    store: Option<Arc<dyn CaseStore>>,
    juror_llm: Option<Arc<dyn LlmClient>>,
    narrative_llm: Option<Arc<dyn LlmClient>>,
    images: Option<Arc<dyn ImageClient>>,
}

impl CourtroomBuilder {
    pub fn new(room: impl AsRef<str>, config: AppConfig) -> Self {
        Self {
            room: canonical_room(room.as_ref()),
            config,
            store: None,
            juror_llm: None,
            narrative_llm: None,
            images: None,
        }
    }

    /// 多个房间共享同一个存储
    pub fn with_store(mut self, store: Arc<dyn CaseStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 陪审员与叙述共用同一个后端
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.juror_llm = Some(Arc::clone(&llm));
        self.narrative_llm = Some(llm);
        self
    }

    pub fn with_narrative_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.narrative_llm = Some(llm);
        self
    }

    pub fn with_images(mut self, images: Arc<dyn ImageClient>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn build(self) -> Result<Courtroom, JuryError> {
        let cfg = &self.config;
        let roster = resolve_roster(&self.room, cfg)?;
        let policy = cfg.retry.policy();

        let juror_llm = self
            .juror_llm
            .unwrap_or_else(|| create_llm_from_config(cfg, BackendRole::Juror));
        let narrative_llm = self
            .narrative_llm
            .unwrap_or_else(|| create_llm_from_config(cfg, BackendRole::Narrative));
        let images = self.images.unwrap_or_else(|| create_image_client(cfg));
        let store = self
            .store
            .unwrap_or_else(|| create_case_store(cfg.storage.db_path.as_deref()));

        let juror = JurorContext {
            text: TextGenerator::new(juror_llm, policy.clone()),
            painter: PortraitPainter::new(images, cfg.retry.image_attempts),
            structured_attempts: cfg.retry.structured_attempts.max(1),
        };

        Ok(Courtroom::new(
            self.room.clone(),
            roster,
            store,
            juror,
            TextGenerator::new(narrative_llm, policy),
            read_example_transcripts(&cfg.app.example_transcripts),
            Duration::from_secs(cfg.app.complete_pause_secs),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jury::Step;
    use crate::storage::MemoryCaseStore;

    #[test]
    fn test_unknown_room_fails_to_build() {
        let result = CourtroomBuilder::new("Z", AppConfig::default())
            .with_llm(Arc::new(MockLlmClient::new()))
            .with_store(Arc::new(MemoryCaseStore::new()))
            .with_images(Arc::new(DisabledImageClient))
            .build();
        assert!(matches!(result, Err(JuryError::UnknownRoom(_))));
    }

    #[test]
    fn test_builds_empty_court() {
        let court = CourtroomBuilder::new("B", AppConfig::default())
            .with_llm(Arc::new(MockLlmClient::new()))
            .with_store(Arc::new(MemoryCaseStore::new()))
            .with_images(Arc::new(DisabledImageClient))
            .build()
            .unwrap();
        assert_eq!(court.room(), "B");
        assert_eq!(court.step(), Step::Empty);
    }

    #[test]
    fn test_room_name_is_canonicalized() {
        let court = CourtroomBuilder::new("a", AppConfig::default())
            .with_llm(Arc::new(MockLlmClient::new()))
            .with_store(Arc::new(MemoryCaseStore::new()))
            .with_images(Arc::new(DisabledImageClient))
            .build()
            .unwrap();
        assert_eq!(court.room(), "A");
    }

    #[test]
    fn test_image_provider_none_disables_portraits() {
        let mut cfg = AppConfig::default();
        cfg.image.provider = "none".into();
        assert!(!create_image_client(&cfg).enabled());
    }
}
