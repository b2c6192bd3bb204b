//! 案件快照持久化
//!
//! 统一的 `CaseStore` 接口，三种实现：
//! - `SqliteCaseStore`：追加写入 SQLite，重启后按房间取最新快照
//! - `MemoryCaseStore`：进程内存，测试与离线运行
//! - `DisabledCaseStore`：不持久化，只生成案件 id

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::jury::{AgentState, CaseState};

pub mod memory;
pub mod sqlite;

pub use memory::{DisabledCaseStore, MemoryCaseStore};
pub use sqlite::SqliteCaseStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Connection lock poisoned")]
    Poisoned,
}

/// 某房间最新案件的快照；各字段独立，可能只有一部分已写入
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseSnapshot {
    pub case_id: Option<String>,
    pub evidence: Option<String>,
    pub agents: Option<Vec<AgentState>>,
    pub verdict: Option<String>,
    pub transcript: Option<String>,
}

impl CaseSnapshot {
    /// 还原为 CaseState；合议轮数不持久化，从 0 计
    pub fn into_case_state(self, room: &str) -> CaseState {
        CaseState {
            room: room.to_string(),
            case_id: self.case_id,
            evidence: self.evidence,
            agents: self.agents,
            verdict: self.verdict,
            transcript: self.transcript,
            num_deliberation_steps: 0,
        }
    }
}

/// 一次保存：只写入为 Some 的字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotUpdate {
    pub evidence: Option<String>,
    pub agents: Option<Vec<AgentState>>,
    pub verdict: Option<String>,
    pub transcript: Option<String>,
}

impl SnapshotUpdate {
    pub fn evidence(evidence: impl Into<String>) -> Self {
        Self {
            evidence: Some(evidence.into()),
            ..Self::default()
        }
    }

    pub fn agents(agents: &[AgentState]) -> Self {
        Self {
            agents: Some(agents.to_vec()),
            ..Self::default()
        }
    }

    pub fn transcript(transcript: impl Into<String>) -> Self {
        Self {
            transcript: Some(transcript.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.evidence.is_none()
            && self.agents.is_none()
            && self.verdict.is_none()
            && self.transcript.is_none()
    }

    /// 把本次更新叠加到快照上
    pub fn apply_to(self, snapshot: &mut CaseSnapshot) {
        if let Some(evidence) = self.evidence {
            snapshot.evidence = Some(evidence);
        }
        if let Some(agents) = self.agents {
            snapshot.agents = Some(agents);
        }
        if let Some(verdict) = self.verdict {
            snapshot.verdict = Some(verdict);
        }
        if let Some(transcript) = self.transcript {
            snapshot.transcript = Some(transcript);
        }
    }
}

/// 案件存储接口
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// 为房间开新案件，返回新案件 id
    async fn create_case(&self, room: &str) -> Result<String, StorageError>;

    /// 追加保存部分字段
    async fn save(
        &self,
        room: &str,
        case_id: &str,
        update: SnapshotUpdate,
    ) -> Result<(), StorageError>;

    /// 房间最新案件的各字段最新值；无案件时全为 None
    async fn load_latest(&self, room: &str) -> Result<CaseSnapshot, StorageError>;

    /// 是否真正持久化
    fn enabled(&self) -> bool {
        true
    }
}

/// 新案件 id（UUID v4）
pub fn new_case_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 根据配置创建存储：未配置路径或打开失败时退回 DisabledCaseStore
pub fn create_case_store(db_path: Option<&Path>) -> Arc<dyn CaseStore> {
    match db_path {
        Some(path) => match SqliteCaseStore::open(path) {
            Ok(store) => {
                tracing::info!(path = %path.display(), "Case store opened");
                Arc::new(store)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to open case store, persistence disabled"
                );
                Arc::new(DisabledCaseStore)
            }
        },
        None => {
            tracing::info!("No storage.db_path configured, persistence disabled");
            Arc::new(DisabledCaseStore)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_applies_only_present_fields() {
        let mut snapshot = CaseSnapshot {
            case_id: Some("c".into()),
            evidence: Some("old".into()),
            transcript: Some("T".into()),
            ..CaseSnapshot::default()
        };
        SnapshotUpdate::evidence("new").apply_to(&mut snapshot);
        assert_eq!(snapshot.evidence.as_deref(), Some("new"));
        assert_eq!(snapshot.transcript.as_deref(), Some("T"));
        assert!(snapshot.agents.is_none());
        assert!(SnapshotUpdate::default().is_empty());
    }

    #[test]
    fn test_into_case_state_resets_step_counter() {
        let state = CaseSnapshot {
            case_id: Some("c".into()),
            verdict: Some("Guilty".into()),
            ..CaseSnapshot::default()
        }
        .into_case_state("B");
        assert_eq!(state.room, "B");
        assert_eq!(state.num_deliberation_steps, 0);
        assert_eq!(state.verdict.as_deref(), Some("Guilty"));
    }

    #[test]
    fn test_bad_path_falls_back_to_disabled() {
        let dir = tempfile::tempdir().unwrap();
        // 目录本身不能作为数据库文件打开
        let store = create_case_store(Some(dir.path()));
        assert!(!store.enabled());
        assert!(!create_case_store(None).enabled());
    }
}
