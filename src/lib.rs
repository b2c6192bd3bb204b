//! Jury - 模拟陪审团合议
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 房间编排、错误类型、优雅关闭
//! - **image**: 陪审员肖像生成（Replicate / 禁用）
//! - **jury**: 陪审员与案件状态、陪审员行为、工作流状态机、计票与选发言人
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）与带重试的文本生成
//! - **protocol**: 结构化回复协议（字段模板、解析、模糊百分比）
//! - **storage**: 案件快照持久化（SQLite / 内存 / 禁用）

pub mod config;
pub mod core;
pub mod image;
pub mod jury;
pub mod llm;
pub mod observability;
pub mod protocol;
pub mod storage;
