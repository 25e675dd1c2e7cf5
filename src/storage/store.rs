//! 异步单词存储
//!
//! `WordStore` 是注入到复习引擎和业务层的显式存储句柄：
//! 先 `open()` 再使用，未打开时所有操作返回 `StorageUnavailable`。
//! 阻塞的 SQLite 调用在 `spawn_blocking` 中执行。

use chrono::Utc;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{info, warn};

use crate::events::{EventBus, VocabEvent};
use crate::storage::migrations::{self, DatabaseHealth};
use crate::storage::models::{NewWord, Word, WordFilter, WordId, WordStats};
use crate::storage::word::WordRepository;
use crate::storage::{open_connection, open_in_memory, StorageError, StorageResult};

/// 数据库位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

impl StoreLocation {
    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Memory => ":memory:".to_string(),
        }
    }
}

/// 单词存储句柄
pub struct WordStore {
    location: StoreLocation,
    repo: RwLock<Option<WordRepository>>,
    events: EventBus,
}

impl WordStore {
    /// 创建指向数据库文件的存储句柄（尚未打开）
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self::with_location(StoreLocation::File(db_path.as_ref().to_path_buf()))
    }

    /// 创建内存存储句柄（尚未打开，用于测试）
    pub fn in_memory() -> Self {
        Self::with_location(StoreLocation::Memory)
    }

    fn with_location(location: StoreLocation) -> Self {
        Self {
            location,
            repo: RwLock::new(None),
            events: EventBus::new(),
        }
    }

    /// 打开数据库并运行迁移
    ///
    /// 重复调用不会重新打开连接。
    pub async fn open(&self) -> StorageResult<()> {
        if self.is_open() {
            return Ok(());
        }

        let location = self.location.clone();
        let conn = tokio::task::spawn_blocking(move || match location {
            StoreLocation::File(path) => open_connection(path),
            StoreLocation::Memory => open_in_memory(),
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))??;

        let mut guard = self
            .repo
            .write()
            .map_err(|e| StorageError::LockError(e.to_string()))?;
        if guard.is_none() {
            *guard = Some(WordRepository::new(Arc::new(Mutex::new(conn))));
            info!(location = %self.location.describe(), "单词存储已打开");
        }

        Ok(())
    }

    /// 关闭存储，之后的操作返回 `StorageUnavailable`
    pub fn close(&self) {
        if let Ok(mut guard) = self.repo.write() {
            if guard.take().is_some() {
                info!(location = %self.location.describe(), "单词存储已关闭");
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.repo.read().map(|guard| guard.is_some()).unwrap_or(false)
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// 状态变化事件总线
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn repo(&self) -> StorageResult<WordRepository> {
        let guard = self
            .repo
            .read()
            .map_err(|e| StorageError::LockError(e.to_string()))?;

        guard
            .clone()
            .ok_or_else(|| StorageError::StorageUnavailable("数据库未初始化".to_string()))
    }

    async fn run_blocking<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&WordRepository) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let repo = self.repo()?;
        tokio::task::spawn_blocking(move || f(&repo))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    /// 变更成功后重新计算并广播统计
    async fn publish_stats(&self) {
        match self.stats().await {
            Ok(stats) => self.events.publish(VocabEvent::StatsChanged { stats }),
            Err(e) => warn!(error = %e, "统计刷新失败"),
        }
    }

    // ============================================================
    // 写操作
    // ============================================================

    /// 添加单词
    ///
    /// 空字段在任何 I/O 之前被拒绝；重复单词返回 `DuplicateWord`。
    pub async fn add(
        &self,
        word: &str,
        translation: &str,
        example: Option<&str>,
    ) -> StorageResult<Word> {
        let new_word = NewWord::new(word, translation, example)?;
        self.insert(new_word).await
    }

    /// 插入已校验的单词
    pub async fn insert(&self, new_word: NewWord) -> StorageResult<Word> {
        let word = self
            .run_blocking(move |repo| repo.add_word(&new_word, Utc::now()))
            .await?;

        info!(id = word.id, word = %word.word, "添加单词");
        self.events.publish(VocabEvent::WordAdded { word: word.clone() });
        self.publish_stats().await;

        Ok(word)
    }

    /// 标记为已学会，设置 last_reviewed 为当前时间
    pub async fn mark_learned(&self, id: WordId) -> StorageResult<Word> {
        let word = self
            .run_blocking(move |repo| repo.mark_learned(id, Utc::now()))
            .await?;

        self.events.publish(VocabEvent::WordLearned {
            id,
            last_reviewed: word.last_reviewed,
        });
        self.publish_stats().await;

        Ok(word)
    }

    /// 重置为学习中，保留 last_reviewed
    pub async fn reset_learned(&self, id: WordId) -> StorageResult<Word> {
        let word = self
            .run_blocking(move |repo| repo.reset_learned(id))
            .await?;

        self.events.publish(VocabEvent::WordReset { id });
        self.publish_stats().await;

        Ok(word)
    }

    /// 永久删除单词
    pub async fn delete(&self, id: WordId) -> StorageResult<()> {
        self.run_blocking(move |repo| repo.delete_word(id)).await?;

        info!(id, "删除单词");
        self.events.publish(VocabEvent::WordDeleted { id });
        self.publish_stats().await;

        Ok(())
    }

    // ============================================================
    // 读操作
    // ============================================================

    pub async fn get(&self, id: WordId) -> StorageResult<Option<Word>> {
        self.run_blocking(move |repo| repo.get_word(id)).await
    }

    /// 按学习状态获取单词，顺序不作保证
    pub async fn get_all(&self, filter: WordFilter) -> StorageResult<Vec<Word>> {
        self.run_blocking(move |repo| repo.get_words(filter)).await
    }

    /// 无放回随机抽取 `min(count, 可用数)` 个单词
    pub async fn get_random(&self, count: usize, only_active: bool) -> StorageResult<Vec<Word>> {
        self.run_blocking(move |repo| {
            let mut rng = rand::thread_rng();
            repo.get_random_words(count, only_active, &mut rng)
        })
        .await
    }

    /// 与 `get_random` 相同，但抽样结果由种子决定
    pub async fn get_random_seeded(
        &self,
        count: usize,
        only_active: bool,
        seed: u64,
    ) -> StorageResult<Vec<Word>> {
        self.run_blocking(move |repo| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            repo.get_random_words(count, only_active, &mut rng)
        })
        .await
    }

    pub async fn search(&self, query: &str, only_learned: bool) -> StorageResult<Vec<Word>> {
        let query = query.to_string();
        self.run_blocking(move |repo| repo.search_words(&query, only_learned))
            .await
    }

    /// 当前统计，每次从数据重新计算
    pub async fn stats(&self) -> StorageResult<WordStats> {
        self.run_blocking(|repo| repo.get_stats()).await
    }

    pub async fn health(&self) -> StorageResult<DatabaseHealth> {
        self.run_blocking(|repo| repo.with_connection(migrations::health_check))
            .await
    }
}
