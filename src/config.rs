//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `JURY__*` 覆盖（双下划线表示嵌套，如 `JURY__LLM__PROVIDER=openai`）。
//! 所有键都有默认值，没有配置文件也能运行。

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::llm::RetryPolicy;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub retry: RetrySection,
    pub image: ImageSection,
    pub storage: StorageSection,
    /// 房间名 -> 陪审员名单；覆盖或补充内置房间
    pub rooms: HashMap<String, Vec<RosterEntry>>,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    /// 示例笔录文件，生成新案件时作为格式示例
    #[serde(default)]
    pub example_transcripts: Vec<PathBuf>,
    /// 裁决公布后停留多久再开新案（秒）
    #[serde(default = "default_complete_pause_secs")]
    pub complete_pause_secs: u64,
}

fn default_complete_pause_secs() -> u64 {
    30
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            example_transcripts: Vec::new(),
            complete_pause_secs: default_complete_pause_secs(),
        }
    }
}

/// [llm] 段：后端选择与采样温度
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：deepseek / openai；优先级由 API Key 与 provider 共同决定
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    /// 陪审员请求的温度
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// 笔录与裁决总结使用的模型；未设置时与陪审员相同
    pub narrative_model: Option<String>,
    #[serde(default = "default_narrative_temperature")]
    pub narrative_temperature: f32,
    #[serde(default)]
    pub deepseek: LlmDeepSeekSection,
    #[serde(default)]
    pub openai: LlmOpenAiSection,
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_temperature() -> f32 {
    1.1
}

fn default_narrative_temperature() -> f32 {
    0.7
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            temperature: default_temperature(),
            narrative_model: None,
            narrative_temperature: default_narrative_temperature(),
            deepseek: LlmDeepSeekSection::default(),
            openai: LlmOpenAiSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmDeepSeekSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmOpenAiSection {
    pub model: Option<String>,
}

/// [retry] 段：各类请求的重试预算
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_backend_attempts")]
    pub backend_attempts: u32,
    #[serde(default = "default_disclaimer_attempts")]
    pub disclaimer_attempts: u32,
    #[serde(default = "default_structured_attempts")]
    pub structured_attempts: u32,
    #[serde(default = "default_image_attempts")]
    pub image_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_backend_attempts() -> u32 {
    4
}

fn default_disclaimer_attempts() -> u32 {
    6
}

fn default_structured_attempts() -> u32 {
    8
}

fn default_image_attempts() -> u32 {
    4
}

fn default_backoff_ms() -> u64 {
    500
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            backend_attempts: default_backend_attempts(),
            disclaimer_attempts: default_disclaimer_attempts(),
            structured_attempts: default_structured_attempts(),
            image_attempts: default_image_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RetrySection {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            backend_attempts: self.backend_attempts.max(1),
            disclaimer_attempts: self.disclaimer_attempts.max(1),
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

/// [image] 段：肖像生成
#[derive(Debug, Clone, Deserialize)]
pub struct ImageSection {
    /// replicate / none
    #[serde(default = "default_image_provider")]
    pub provider: String,
    pub model_version: Option<String>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    pub api_base: Option<String>,
    #[serde(default = "default_image_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_image_provider() -> String {
    "replicate".to_string()
}

fn default_width() -> u32 {
    512
}

fn default_height() -> u32 {
    1024
}

fn default_image_timeout_secs() -> u64 {
    120
}

impl Default for ImageSection {
    fn default() -> Self {
        Self {
            provider: default_image_provider(),
            model_version: None,
            width: default_width(),
            height: default_height(),
            api_base: None,
            timeout_secs: default_image_timeout_secs(),
        }
    }
}

/// [storage] 段；未设置 db_path 时不持久化
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageSection {
    pub db_path: Option<PathBuf>,
}

impl AppConfig {
    /// 按房间名查找配置的名单（忽略大小写：配置源可能把键转成小写）
    pub fn room(&self, name: &str) -> Option<&[RosterEntry]> {
        self.rooms
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, entries)| entries.as_slice())
    }
}

/// 名单中的一名陪审员
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RosterEntry {
    pub name: String,
    pub description: String,
}

/// 从 config 目录加载配置，环境变量 JURY__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 JURY__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("JURY")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

/// 读取示例笔录；读不到的文件跳过
pub fn read_example_transcripts(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|path| match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping example transcript");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let c = AppConfig::default();
        assert_eq!(c.app.complete_pause_secs, 30);
        assert_eq!(c.retry.structured_attempts, 8);
        assert_eq!(c.retry.policy().backend_attempts, 4);
        assert_eq!((c.image.width, c.image.height), (512, 1024));
        assert!((c.llm.temperature - 1.1).abs() < f32::EPSILON);
        assert!(c.storage.db_path.is_none());
        assert!(c.rooms.is_empty());
    }

    #[test]
    fn test_load_explicit_file_with_rooms() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[app]
complete_pause_secs = 5

[retry]
structured_attempts = 3

[[rooms.D]]
name = "Sherlock Holmes"
description = "The consulting detective Sherlock Holmes"

[[rooms.D]]
name = "Dr. Watson"
description = "The loyal army doctor John Watson"
"#
        )
        .unwrap();

        let c = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(c.app.complete_pause_secs, 5);
        assert_eq!(c.retry.structured_attempts, 3);
        assert_eq!(c.retry.disclaimer_attempts, 6);
        let room = c.room("D").unwrap();
        assert_eq!(room.len(), 2);
        assert_eq!(room[1].name, "Dr. Watson");
    }

    #[test]
    fn test_read_example_transcripts_skips_missing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "The People v. Crumb").unwrap();
        let texts = read_example_transcripts(&[
            file.path().to_path_buf(),
            PathBuf::from("/definitely/not/here.txt"),
        ]);
        assert_eq!(texts, vec!["The People v. Crumb".to_string()]);
    }
}
