//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）与带重试的文本生成

pub mod deepseek;
pub mod generate;
pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

pub use deepseek::{create_deepseek_client, DEEPSEEK_CHAT};
pub use generate::{is_disclaimer, RetryPolicy, TextGenerator};
pub use message::Message;
pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use traits::{LlmClient, LlmError};
