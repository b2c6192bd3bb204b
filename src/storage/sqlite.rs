//! SQLite 案件存储
//!
//! 只追加不更新：每次保存为每个字段插入一条记录，读取时取每种字段的最新一条。
//! rusqlite 是同步接口，所有访问都经 `spawn_blocking` 执行。

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{new_case_id, CaseSnapshot, CaseStore, SnapshotUpdate, StorageError};
use crate::jury::AgentState;

const KIND_EVIDENCE: &str = "evidence";
const KIND_AGENTS: &str = "agents";
const KIND_VERDICT: &str = "verdict";
const KIND_TRANSCRIPT: &str = "transcript";

pub struct SqliteCaseStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCaseStore {
    /// 打开（必要时创建）数据库文件并建表
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        init_tables(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StorageError::Poisoned)?;
            f(&mut *guard)
        })
        .await?
    }
}

fn init_tables(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS cases (
            id TEXT PRIMARY KEY,
            room TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS case_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            case_id TEXT NOT NULL,
            room TEXT NOT NULL,
            kind TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_cases_room ON cases(room);
        CREATE INDEX IF NOT EXISTS idx_case_records_case_kind ON case_records(case_id, kind);",
    )?;
    Ok(())
}

fn latest_body(conn: &Connection, case_id: &str, kind: &str) -> Result<Option<String>, StorageError> {
    let body = conn
        .query_row(
            "SELECT body FROM case_records WHERE case_id = ?1 AND kind = ?2 ORDER BY id DESC LIMIT 1",
            params![case_id, kind],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(body)
}

#[async_trait]
impl CaseStore for SqliteCaseStore {
    async fn create_case(&self, room: &str) -> Result<String, StorageError> {
        let room = room.to_string();
        self.run(move |conn| {
            let id = new_case_id();
            conn.execute(
                "INSERT INTO cases (id, room, created_at) VALUES (?1, ?2, ?3)",
                params![id, room, Utc::now()],
            )?;
            Ok(id)
        })
        .await
    }

    async fn save(
        &self,
        room: &str,
        case_id: &str,
        update: SnapshotUpdate,
    ) -> Result<(), StorageError> {
        if update.is_empty() {
            return Ok(());
        }
        let mut records: Vec<(&'static str, String)> = Vec::new();
        if let Some(evidence) = update.evidence {
            records.push((KIND_EVIDENCE, evidence));
        }
        if let Some(agents) = update.agents {
            records.push((KIND_AGENTS, serde_json::to_string(&agents)?));
        }
        if let Some(verdict) = update.verdict {
            records.push((KIND_VERDICT, verdict));
        }
        if let Some(transcript) = update.transcript {
            records.push((KIND_TRANSCRIPT, transcript));
        }

        let room = room.to_string();
        let case_id = case_id.to_string();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let now = Utc::now();
            for (kind, body) in &records {
                tx.execute(
                    "INSERT INTO case_records (case_id, room, kind, body, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![case_id, room, kind, body, now],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn load_latest(&self, room: &str) -> Result<CaseSnapshot, StorageError> {
        let room = room.to_string();
        self.run(move |conn| {
            let case_id: Option<String> = conn
                .query_row(
                    "SELECT id FROM cases WHERE room = ?1 ORDER BY rowid DESC LIMIT 1",
                    params![room],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(case_id) = case_id else {
                return Ok(CaseSnapshot::default());
            };

            let agents = match latest_body(conn, &case_id, KIND_AGENTS)? {
                Some(body) => Some(serde_json::from_str::<Vec<AgentState>>(&body)?),
                None => None,
            };
            Ok(CaseSnapshot {
                evidence: latest_body(conn, &case_id, KIND_EVIDENCE)?,
                agents,
                verdict: latest_body(conn, &case_id, KIND_VERDICT)?,
                transcript: latest_body(conn, &case_id, KIND_TRANSCRIPT)?,
                case_id: Some(case_id),
            })
        })
        .await
    }
}
