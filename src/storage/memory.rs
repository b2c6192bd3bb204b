//! 内存存储与禁用存储

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{new_case_id, CaseSnapshot, CaseStore, SnapshotUpdate, StorageError};

/// 进程内存中的案件存储；每个房间只保留最新案件的各字段最新值
#[derive(Default)]
pub struct MemoryCaseStore {
    /// 房间 -> 最新案件快照
    rooms: RwLock<HashMap<String, CaseSnapshot>>,
    saves: std::sync::atomic::AtomicUsize,
}

impl MemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 成功写入的次数
    pub fn save_count(&self) -> usize {
        self.saves.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl CaseStore for MemoryCaseStore {
    async fn create_case(&self, room: &str) -> Result<String, StorageError> {
        let id = new_case_id();
        self.rooms.write().await.insert(
            room.to_string(),
            CaseSnapshot {
                case_id: Some(id.clone()),
                ..CaseSnapshot::default()
            },
        );
        Ok(id)
    }

    async fn save(
        &self,
        room: &str,
        case_id: &str,
        update: SnapshotUpdate,
    ) -> Result<(), StorageError> {
        let mut rooms = self.rooms.write().await;
        match rooms.get_mut(room) {
            Some(snapshot) if snapshot.case_id.as_deref() == Some(case_id) => {
                update.apply_to(snapshot);
                self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
            _ => tracing::debug!(room, case_id, "Ignoring save for a superseded case"),
        }
        Ok(())
    }

    async fn load_latest(&self, room: &str) -> Result<CaseSnapshot, StorageError> {
        Ok(self.rooms.read().await.get(room).cloned().unwrap_or_default())
    }
}

/// 不持久化：只分配案件 id，写入丢弃，读取为空
pub struct DisabledCaseStore;

#[async_trait]
impl CaseStore for DisabledCaseStore {
    async fn create_case(&self, _room: &str) -> Result<String, StorageError> {
        Ok(new_case_id())
    }

    async fn save(
        &self,
        _room: &str,
        _case_id: &str,
        _update: SnapshotUpdate,
    ) -> Result<(), StorageError> {
        Ok(())
    }

    async fn load_latest(&self, _room: &str) -> Result<CaseSnapshot, StorageError> {
        Ok(CaseSnapshot::default())
    }

    fn enabled(&self) -> bool {
        false
    }
}
