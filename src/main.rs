//! Jury - 模拟陪审团合议
//!
//! 入口：初始化日志、加载配置，为每个房间启动一个独立的编排任务，直到收到关闭信号。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::task::JoinSet;

use jury::config::{load_config, AppConfig};
use jury::core::{CourtroomBuilder, ShutdownManager, ShutdownReason};
use jury::jury::unique_rooms;
use jury::storage::create_case_store;

#[derive(Parser, Debug)]
#[command(name = "jury")]
#[command(version, about = "Simulated jury deliberation", long_about = None)]
struct Cli {
    /// 配置文件路径（覆盖 config/default.toml 中的键）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run deliberation in one or more court rooms
    Run {
        /// Court room names, case-insensitive (built-in: A, B, C)
        #[arg(required = true)]
        rooms: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jury::observability::init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.clone()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    match cli.command {
        Command::Run { rooms } => run_rooms(cfg, rooms).await,
    }
}

async fn run_rooms(cfg: AppConfig, rooms: Vec<String>) -> anyhow::Result<()> {
    let rooms = unique_rooms(&rooms);
    let store = create_case_store(cfg.storage.db_path.as_deref());

    let mut courts = Vec::with_capacity(rooms.len());
    for room in &rooms {
        let court = CourtroomBuilder::new(room, cfg.clone())
            .with_store(Arc::clone(&store))
            .build()
            .with_context(|| format!("Failed to set up court room {}", room))?;
        courts.push(court);
    }

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let mut tasks = JoinSet::new();
    for mut court in courts {
        let token = shutdown.token();
        tasks.spawn(async move {
            let result = court.run(token).await;
            (court.room().to_string(), result)
        });
    }
    tracing::info!(rooms = ?rooms, "Court is in session");

    let mut failed = None;
    while let Some(joined) = tasks.join_next().await {
        let (room, result) = joined.context("Court room task panicked")?;
        if let Err(e) = result {
            tracing::error!(room = %room, error = %e, "Court room stopped");
            shutdown.shutdown(ShutdownReason::RoomFailed {
                room: room.clone(),
                error: e.to_string(),
            });
            failed.get_or_insert((room, e));
        }
    }

    match failed {
        Some((room, e)) => Err(e).with_context(|| format!("Court room {} failed", room)),
        None => {
            tracing::info!(reason = ?shutdown.reason(), "All court rooms adjourned");
            Ok(())
        }
    }
}
