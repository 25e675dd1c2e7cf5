//! Word 数据库操作
//!
//! 提供单词的 CRUD、过滤、随机抽取与搜索。

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::{params, Connection, ErrorCode, TransactionBehavior};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::storage::models::{format_datetime, NewWord, Word, WordFilter, WordId, WordStats};
use crate::storage::{StorageError, StorageResult};

const WORD_COLUMNS: &str = "id, word, translation, example, learned, created_at, last_reviewed";

/// 单词数据库操作仓库
///
/// 内部持有 `Arc<Mutex<Connection>>`，克隆后共享同一连接。
/// 所有写操作都在持有连接锁期间完成。
#[derive(Clone)]
pub struct WordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WordRepository {
    /// 创建新的 WordRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取连接锁
    fn get_conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    /// 在锁内运行只读查询
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let conn = self.get_conn()?;
        f(&conn)
    }

    // ============================================================
    // Word 操作
    // ============================================================

    /// 添加单词
    ///
    /// 重复检查与插入在同一个 IMMEDIATE 事务内完成。
    pub fn add_word(&self, new_word: &NewWord, now: DateTime<Utc>) -> StorageResult<Word> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let word = Self::add_word_internal(&tx, new_word, now)?;
        tx.commit()?;
        Ok(word)
    }

    /// 根据 ID 获取单词
    pub fn get_word(&self, id: WordId) -> StorageResult<Option<Word>> {
        let conn = self.get_conn()?;
        Self::get_word_internal(&conn, id)
    }

    /// 按学习状态获取单词
    pub fn get_words(&self, filter: WordFilter) -> StorageResult<Vec<Word>> {
        let conn = self.get_conn()?;
        Self::get_words_internal(&conn, filter)
    }

    /// 随机抽取单词
    pub fn get_random_words<R: Rng + ?Sized>(
        &self,
        count: usize,
        only_active: bool,
        rng: &mut R,
    ) -> StorageResult<Vec<Word>> {
        let conn = self.get_conn()?;
        Self::get_random_words_internal(&conn, count, only_active, rng)
    }

    /// 搜索单词
    pub fn search_words(&self, query: &str, only_learned: bool) -> StorageResult<Vec<Word>> {
        let conn = self.get_conn()?;
        Self::search_words_internal(&conn, query, only_learned)
    }

    /// 标记为已学会
    pub fn mark_learned(&self, id: WordId, now: DateTime<Utc>) -> StorageResult<Word> {
        let conn = self.get_conn()?;
        Self::mark_learned_internal(&conn, id, now)
    }

    /// 重置为学习中
    pub fn reset_learned(&self, id: WordId) -> StorageResult<Word> {
        let conn = self.get_conn()?;
        Self::reset_learned_internal(&conn, id)
    }

    /// 删除单词
    pub fn delete_word(&self, id: WordId) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::delete_word_internal(&conn, id)
    }

    /// 获取统计
    pub fn get_stats(&self) -> StorageResult<WordStats> {
        let conn = self.get_conn()?;
        Self::get_stats_internal(&conn)
    }

    // ============================================================
    // 内部实现方法（静态方法，接受 &Connection）
    // ============================================================

    /// 添加单词（内部实现）
    pub fn add_word_internal(
        conn: &Connection,
        new_word: &NewWord,
        now: DateTime<Utc>,
    ) -> StorageResult<Word> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM words WHERE word = ?1)",
            params![new_word.word],
            |row| row.get(0),
        )?;

        if exists {
            return Err(StorageError::DuplicateWord(new_word.word.clone()));
        }

        let inserted = conn.execute(
            r#"
            INSERT INTO words (word, translation, example, learned, created_at, last_reviewed)
            VALUES (?1, ?2, ?3, 0, ?4, NULL)
            "#,
            params![
                new_word.word,
                new_word.translation,
                new_word.example,
                format_datetime(now),
            ],
        );

        match inserted {
            Ok(_) => {}
            // 唯一索引兜底
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(StorageError::DuplicateWord(new_word.word.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        Self::get_word_internal(conn, id)?.ok_or(StorageError::NotFound(id))
    }

    /// 根据 ID 获取单词（内部实现）
    pub fn get_word_internal(conn: &Connection, id: WordId) -> StorageResult<Option<Word>> {
        let sql = format!("SELECT {} FROM words WHERE id = ?1", WORD_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![id], |row| Word::from_row(row)) {
            Ok(word) => Ok(Some(word)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按学习状态获取单词（内部实现）
    pub fn get_words_internal(conn: &Connection, filter: WordFilter) -> StorageResult<Vec<Word>> {
        let sql = format!(
            "SELECT {} FROM words {} ORDER BY id ASC",
            WORD_COLUMNS,
            filter.where_clause()
        );
        let mut stmt = conn.prepare(&sql)?;

        let words = stmt
            .query_map([], |row| Word::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(words)
    }

    /// 随机抽取单词（内部实现）
    ///
    /// 无放回均匀抽样，数量为 `min(count, 可用数)`。
    pub fn get_random_words_internal<R: Rng + ?Sized>(
        conn: &Connection,
        count: usize,
        only_active: bool,
        rng: &mut R,
    ) -> StorageResult<Vec<Word>> {
        let filter = if only_active {
            WordFilter::Active
        } else {
            WordFilter::All
        };
        let words = Self::get_words_internal(conn, filter)?;

        let mut sample: Vec<Word> = words.choose_multiple(rng, count).cloned().collect();
        sample.shuffle(rng);
        Ok(sample)
    }

    /// 搜索单词（内部实现）
    ///
    /// 单词按不区分大小写的子串匹配，翻译按子串匹配；空查询返回全部过滤结果。
    pub fn search_words_internal(
        conn: &Connection,
        query: &str,
        only_learned: bool,
    ) -> StorageResult<Vec<Word>> {
        let filter = if only_learned {
            WordFilter::Learned
        } else {
            WordFilter::All
        };
        let words = Self::get_words_internal(conn, filter)?;

        let query = query.trim();
        if query.is_empty() {
            return Ok(words);
        }

        let lower_query = query.to_lowercase();
        Ok(words
            .into_iter()
            .filter(|w| w.word.to_lowercase().contains(&lower_query) || w.translation.contains(query))
            .collect())
    }

    /// 标记为已学会（内部实现）
    pub fn mark_learned_internal(
        conn: &Connection,
        id: WordId,
        now: DateTime<Utc>,
    ) -> StorageResult<Word> {
        let affected = conn.execute(
            "UPDATE words SET learned = 1, last_reviewed = ?2 WHERE id = ?1",
            params![id, format_datetime(now)],
        )?;

        if affected == 0 {
            return Err(StorageError::NotFound(id));
        }

        Self::get_word_internal(conn, id)?.ok_or(StorageError::NotFound(id))
    }

    /// 重置为学习中（内部实现）
    ///
    /// 不清除 last_reviewed。
    pub fn reset_learned_internal(conn: &Connection, id: WordId) -> StorageResult<Word> {
        let affected = conn.execute("UPDATE words SET learned = 0 WHERE id = ?1", params![id])?;

        if affected == 0 {
            return Err(StorageError::NotFound(id));
        }

        Self::get_word_internal(conn, id)?.ok_or(StorageError::NotFound(id))
    }

    /// 删除单词（内部实现）
    pub fn delete_word_internal(conn: &Connection, id: WordId) -> StorageResult<()> {
        let affected = conn.execute("DELETE FROM words WHERE id = ?1", params![id])?;

        if affected == 0 {
            return Err(StorageError::NotFound(id));
        }

        Ok(())
    }

    /// 获取统计（内部实现）
    pub fn get_stats_internal(conn: &Connection) -> StorageResult<WordStats> {
        let (total, learned): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(learned), 0) FROM words",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(WordStats::new(total as u64, learned as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::open_in_memory;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup_repo() -> WordRepository {
        let conn = open_in_memory().unwrap();
        WordRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn add(repo: &WordRepository, word: &str, translation: &str) -> Word {
        let new_word = NewWord::new(word, translation, None).unwrap();
        repo.add_word(&new_word, Utc::now()).unwrap()
    }

    #[test]
    fn test_word_crud() {
        let repo = setup_repo();

        let word = add(&repo, "apple", "蘋果");
        assert!(!word.learned);
        assert!(word.last_reviewed.is_none());

        let fetched = repo.get_word(word.id).unwrap().unwrap();
        assert_eq!(fetched, word);

        repo.delete_word(word.id).unwrap();
        assert!(repo.get_word(word.id).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_word_rejected() {
        let repo = setup_repo();
        add(&repo, "apple", "蘋果");

        let duplicate = NewWord::new("apple", "另一個翻譯", None).unwrap();
        let result = repo.add_word(&duplicate, Utc::now());
        assert!(matches!(result, Err(StorageError::DuplicateWord(w)) if w == "apple"));
        assert_eq!(repo.get_stats().unwrap().total, 1);
    }

    #[test]
    fn test_word_uniqueness_is_case_sensitive() {
        let repo = setup_repo();
        add(&repo, "apple", "蘋果");
        add(&repo, "Apple", "蘋果公司");
        assert_eq!(repo.get_stats().unwrap().total, 2);
    }

    #[test]
    fn test_unique_index_backstop() {
        let repo = setup_repo();
        add(&repo, "apple", "蘋果");

        // 绕过存在性检查，直接命中唯一索引
        let conn = repo.get_conn().unwrap();
        let result = conn.execute(
            "INSERT INTO words (word, translation, created_at) VALUES ('apple', 'x', '2025-01-01T00:00:00.000Z')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_ids_are_not_reused() {
        let repo = setup_repo();
        let first = add(&repo, "apple", "蘋果");
        repo.delete_word(first.id).unwrap();

        let second = add(&repo, "apple", "蘋果");
        assert!(second.id > first.id);
    }

    #[test]
    fn test_filter_by_learned() {
        let repo = setup_repo();
        let apple = add(&repo, "apple", "蘋果");
        add(&repo, "banana", "香蕉");
        repo.mark_learned(apple.id, Utc::now()).unwrap();

        assert_eq!(repo.get_words(WordFilter::All).unwrap().len(), 2);
        let learned = repo.get_words(WordFilter::Learned).unwrap();
        assert_eq!(learned.len(), 1);
        assert_eq!(learned[0].word, "apple");
        let active = repo.get_words(WordFilter::Active).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].word, "banana");
    }

    #[test]
    fn test_mark_then_reset_keeps_last_reviewed() {
        let repo = setup_repo();
        let word = add(&repo, "apple", "蘋果");

        let learned = repo.mark_learned(word.id, Utc::now()).unwrap();
        assert!(learned.learned);
        let reviewed = learned.last_reviewed.expect("last_reviewed should be set");

        let reset = repo.reset_learned(word.id).unwrap();
        assert!(!reset.learned);
        assert_eq!(reset.last_reviewed, Some(reviewed));
    }

    #[test]
    fn test_mutations_on_unknown_id() {
        let repo = setup_repo();
        assert!(matches!(
            repo.mark_learned(42, Utc::now()),
            Err(StorageError::NotFound(42))
        ));
        assert!(matches!(repo.reset_learned(42), Err(StorageError::NotFound(42))));
        assert!(matches!(repo.delete_word(42), Err(StorageError::NotFound(42))));
    }

    #[test]
    fn test_second_delete_fails() {
        let repo = setup_repo();
        let word = add(&repo, "apple", "蘋果");
        repo.delete_word(word.id).unwrap();
        assert!(matches!(
            repo.delete_word(word.id),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_random_words_only_active() {
        let repo = setup_repo();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for (i, w) in ["a1", "a2", "a3", "a4", "a5"].iter().enumerate() {
            let word = add(&repo, w, "翻譯");
            if i % 2 == 0 {
                repo.mark_learned(word.id, Utc::now()).unwrap();
            }
        }

        let sample = repo.get_random_words(10, true, &mut rng).unwrap();
        assert_eq!(sample.len(), 2);
        assert!(sample.iter().all(|w| !w.learned));

        let sample = repo.get_random_words(3, false, &mut rng).unwrap();
        assert_eq!(sample.len(), 3);
        let mut ids: Vec<_> = sample.iter().map(|w| w.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_random_words_empty_store() {
        let repo = setup_repo();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(repo.get_random_words(5, true, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_search_words() {
        let repo = setup_repo();
        let apple = add(&repo, "Apple", "蘋果");
        add(&repo, "application", "應用");
        add(&repo, "banana", "香蕉");
        repo.mark_learned(apple.id, Utc::now()).unwrap();

        assert_eq!(repo.search_words("APP", false).unwrap().len(), 2);
        assert_eq!(repo.search_words("  app  ", true).unwrap().len(), 1);
        assert_eq!(repo.search_words("香蕉", false).unwrap()[0].word, "banana");
        assert_eq!(repo.search_words("   ", false).unwrap().len(), 3);
        assert_eq!(repo.search_words("", true).unwrap().len(), 1);
        assert!(repo.search_words("cherry", false).unwrap().is_empty());
    }

    #[test]
    fn test_stats() {
        let repo = setup_repo();
        assert_eq!(repo.get_stats().unwrap(), WordStats::default());

        let apple = add(&repo, "apple", "蘋果");
        add(&repo, "banana", "香蕉");
        repo.mark_learned(apple.id, Utc::now()).unwrap();

        let stats = repo.get_stats().unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.learned, 1);
        assert_eq!(stats.active, 1);
    }
}
