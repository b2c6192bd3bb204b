//! 核心编排层：错误类型、优雅关闭、房间编排与装配

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod shutdown;

pub use builder::{create_image_client, create_llm_from_config, BackendRole, CourtroomBuilder};
pub use error::JuryError;
pub use orchestrator::Courtroom;
pub use shutdown::{ShutdownManager, ShutdownReason};
