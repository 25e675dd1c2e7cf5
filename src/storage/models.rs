//! 数据模型定义
//!
//! 定义单词存储所需的数据结构，以及与数据库行之间的转换。

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Result as SqliteResult, Row};
use serde::{Deserialize, Serialize};

use crate::storage::{StorageError, StorageResult};

/// 单词唯一标识（由存储分配，自增且不复用）
pub type WordId = i64;

// ============================================================
// Word - 单词记录
// ============================================================

/// 单词记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    /// 单词唯一标识
    pub id: WordId,
    /// 英文单词（全库唯一，区分大小写）
    pub word: String,
    /// 翻译
    pub translation: String,
    /// 例句，默认为空
    pub example: String,
    /// 是否已学会
    pub learned: bool,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 最近一次标记为学会的时间
    pub last_reviewed: Option<DateTime<Utc>>,
}

impl Word {
    /// 从数据库行解析
    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            word: row.get("word")?,
            translation: row.get("translation")?,
            example: row.get::<_, Option<String>>("example")?.unwrap_or_default(),
            learned: row.get::<_, i32>("learned")? != 0,
            created_at: parse_datetime_column(row, "created_at")?,
            last_reviewed: match row.get::<_, Option<String>>("last_reviewed")? {
                Some(raw) => Some(parse_datetime(&raw).ok_or_else(|| bad_datetime("last_reviewed", raw))?),
                None => None,
            },
        })
    }

    /// 是否属于活跃单词（未学会）
    pub fn is_active(&self) -> bool {
        !self.learned
    }
}

// ============================================================
// NewWord - 待插入的单词
// ============================================================

/// 通过校验的新单词输入
///
/// 所有字段已去除首尾空白，`word` 与 `translation` 保证非空。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWord {
    pub word: String,
    pub translation: String,
    pub example: String,
}

impl NewWord {
    /// 校验并构造新单词
    ///
    /// 在任何 I/O 之前拒绝空的单词或翻译。
    pub fn new(word: &str, translation: &str, example: Option<&str>) -> StorageResult<Self> {
        let word = word.trim();
        let translation = translation.trim();

        if word.is_empty() {
            return Err(StorageError::Validation("单词不能为空".to_string()));
        }
        if translation.is_empty() {
            return Err(StorageError::Validation("翻译不能为空".to_string()));
        }

        Ok(Self {
            word: word.to_string(),
            translation: translation.to_string(),
            example: example.map(str::trim).unwrap_or_default().to_string(),
        })
    }
}

// ============================================================
// 查询过滤与统计
// ============================================================

/// 按学习状态过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordFilter {
    /// 全部单词
    #[default]
    All,
    /// 仅活跃（未学会）单词
    Active,
    /// 仅已学会单词
    Learned,
}

impl WordFilter {
    /// 对应的 SQL 过滤条件
    pub(crate) fn where_clause(&self) -> &'static str {
        match self {
            Self::All => "",
            Self::Active => "WHERE learned = 0",
            Self::Learned => "WHERE learned = 1",
        }
    }

    pub fn matches(&self, word: &Word) -> bool {
        match self {
            Self::All => true,
            Self::Active => !word.learned,
            Self::Learned => word.learned,
        }
    }
}

/// 单词统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WordStats {
    /// 单词总数
    pub total: u64,
    /// 已学会单词数
    pub learned: u64,
    /// 学习中单词数
    pub active: u64,
}

impl WordStats {
    pub fn new(total: u64, learned: u64) -> Self {
        Self {
            total,
            learned,
            active: total.saturating_sub(learned),
        }
    }
}

// ============================================================
// 时间格式
// ============================================================

/// 解析数据库中的时间字符串
///
/// 兼容 RFC3339 与 `%Y-%m-%d %H:%M:%S` 两种格式。
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
}

/// 格式化时间用于存储
pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_datetime_column(row: &Row, column: &str) -> SqliteResult<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    parse_datetime(&raw).ok_or_else(|| bad_datetime(column, raw))
}

fn bad_datetime(column: &str, raw: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        Type::Text,
        format!("{} 时间格式无效: {}", column, raw).into(),
    )
}
