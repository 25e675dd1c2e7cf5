//! 数据库迁移模块
//!
//! 管理 SQLite 数据库的版本迁移，保证升级时表结构与索引完整、数据不丢失。
//!
//! ## 迁移策略
//! - 每个迁移在独立事务中执行
//! - 已应用的迁移记录在 schema_migrations 表中，不会重复执行

use rusqlite::Connection;
use tracing::{error, info};

use crate::storage::{StorageError, StorageResult};

/// 当前数据库 schema 版本
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// 必需的数据表
const REQUIRED_TABLES: &[&str] = &["words", "schema_migrations"];

/// 迁移记录
#[derive(Debug, Clone)]
pub struct Migration {
    /// 迁移版本号
    pub version: i32,
    /// 迁移名称/描述
    pub name: &'static str,
    /// 迁移 SQL 语句
    pub sql: &'static str,
}

/// 获取所有迁移定义
///
/// 返回按版本号排序的迁移列表
pub fn get_migrations() -> Vec<Migration> {
    vec![
        // V1: 单词表，word 唯一索引 + learned 二级索引
        Migration {
            version: 1,
            name: "初始表结构",
            sql: r#"
            CREATE TABLE IF NOT EXISTS words (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                word TEXT NOT NULL,
                translation TEXT NOT NULL,
                example TEXT NOT NULL DEFAULT '',
                learned INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                last_reviewed TEXT
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_words_word ON words(word);
            CREATE INDEX IF NOT EXISTS idx_words_learned ON words(learned);
            "#,
        },
        // V2: 复习时间索引
        Migration {
            version: 2,
            name: "添加复习时间索引",
            sql: r#"
            CREATE INDEX IF NOT EXISTS idx_words_learned_reviewed
                ON words(learned, last_reviewed);
            "#,
        },
    ]
}

/// 确保迁移表存在
fn ensure_migrations_table(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at INTEGER NOT NULL
        );
        "#,
    )
    .map_err(|e| StorageError::Migration(format!("创建迁移表失败: {}", e)))?;

    Ok(())
}

/// 获取当前数据库版本
///
/// 没有迁移记录时返回 0
pub fn get_current_version(conn: &Connection) -> StorageResult<i32> {
    ensure_migrations_table(conn)?;

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// 获取已应用的迁移版本列表
fn get_applied_versions(conn: &Connection) -> StorageResult<Vec<i32>> {
    ensure_migrations_table(conn)?;

    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<i32>, _>>()?;

    Ok(versions)
}

/// 运行数据库迁移
///
/// 检查当前数据库版本并执行尚未应用的迁移。
/// 返回最终版本号。
pub fn run_migrations(conn: &mut Connection) -> StorageResult<i32> {
    run_migration_list(conn, &get_migrations())
}

fn run_migration_list(conn: &mut Connection, migrations: &[Migration]) -> StorageResult<i32> {
    let applied_versions = get_applied_versions(conn)?;
    let mut final_version = get_current_version(conn)?;

    info!(
        current = final_version,
        target = CURRENT_SCHEMA_VERSION,
        "检查数据库版本"
    );

    for migration in migrations {
        if applied_versions.contains(&migration.version) {
            continue;
        }

        info!(version = migration.version, name = migration.name, "运行迁移");

        match execute_migration_in_transaction(conn, migration) {
            Ok(()) => final_version = final_version.max(migration.version),
            Err(e) => {
                error!(version = migration.version, error = %e, "迁移失败");
                return Err(e);
            }
        }
    }

    info!(version = final_version, "数据库迁移完成");
    Ok(final_version)
}

/// 在事务中执行单个迁移
fn execute_migration_in_transaction(
    conn: &mut Connection,
    migration: &Migration,
) -> StorageResult<()> {
    let tx = conn.transaction()?;

    tx.execute_batch(migration.sql).map_err(|e| {
        StorageError::Migration(format!("迁移 v{} 执行失败: {}", migration.version, e))
    })?;

    tx.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.name,
            chrono::Utc::now().timestamp()
        ],
    )?;

    // tx 在出错提前返回时自动回滚
    tx.commit()?;
    Ok(())
}

/// 迁移记录
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i32,
    pub name: String,
    pub applied_at: i64,
}

/// 获取迁移历史
pub fn get_migration_history(conn: &Connection) -> StorageResult<Vec<MigrationRecord>> {
    ensure_migrations_table(conn)?;

    let mut stmt =
        conn.prepare("SELECT version, name, applied_at FROM schema_migrations ORDER BY version")?;

    let records = stmt
        .query_map([], |row| {
            Ok(MigrationRecord {
                version: row.get(0)?,
                name: row.get(1)?,
                applied_at: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

/// 数据库健康状态
#[derive(Debug, Clone)]
pub struct DatabaseHealth {
    pub is_healthy: bool,
    pub schema_version: i32,
    pub needs_migration: bool,
    pub missing_tables: Vec<String>,
    pub migration_count: usize,
}

/// 数据库健康检查
pub fn health_check(conn: &Connection) -> StorageResult<DatabaseHealth> {
    let schema_version = get_current_version(conn)?;

    let mut missing_tables = Vec::new();
    for table in REQUIRED_TABLES {
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name=?1",
            [table],
            |row| row.get(0),
        )?;
        if !exists {
            missing_tables.push(table.to_string());
        }
    }

    let migration_count = get_applied_versions(conn)?.len();
    let needs_migration = schema_version < CURRENT_SCHEMA_VERSION;

    Ok(DatabaseHealth {
        is_healthy: missing_tables.is_empty() && !needs_migration,
        schema_version,
        needs_migration,
        missing_tables,
        migration_count,
    })
}
