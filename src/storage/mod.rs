//! SQLite 离线存储模块
//!
//! 提供本地 SQLite 单词存储，支持：
//! - 单词的持久化与唯一性约束
//! - 按学习状态过滤、随机抽取与搜索
//! - 版本化迁移，升级不丢数据

// ============================================================
// 子模块声明
// ============================================================

pub mod migrations;
pub mod models;
pub mod store;
pub mod word;

// ============================================================
// 重新导出主要类型
// ============================================================

pub use migrations::{health_check, run_migrations, DatabaseHealth};
pub use models::{NewWord, Word, WordFilter, WordId, WordStats};
pub use store::WordStore;
pub use word::WordRepository;

// ============================================================
// 依赖导入
// ============================================================

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

// ============================================================
// 错误类型定义
// ============================================================

/// 存储模块错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("校验失败: {0}")]
    Validation(String),

    #[error("单词已存在: {0}")]
    DuplicateWord(String),

    #[error("单词不存在: {0}")]
    NotFound(WordId),

    #[error("存储不可用: {0}")]
    StorageUnavailable(String),

    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("迁移错误: {0}")]
    Migration(String),

    #[error("锁获取失败: {0}")]
    LockError(String),

    #[error("后台任务失败: {0}")]
    Task(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// ============================================================
// 连接初始化
// ============================================================

/// 打开数据库文件并运行迁移
///
/// 自动创建父目录，启用 WAL 模式。
pub fn open_connection<P: AsRef<Path>>(db_path: P) -> StorageResult<Connection> {
    if let Some(parent) = db_path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::StorageUnavailable(format!(
                    "创建数据目录 {} 失败: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let mut connection = Connection::open(&db_path)?;

    connection.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         PRAGMA foreign_keys=ON;",
    )?;

    migrations::run_migrations(&mut connection)?;
    Ok(connection)
}

/// 创建内存数据库（用于测试）
pub fn open_in_memory() -> StorageResult<Connection> {
    let mut connection = Connection::open_in_memory()?;
    connection.execute_batch("PRAGMA foreign_keys=ON;")?;

    migrations::run_migrations(&mut connection)?;
    Ok(connection)
}
