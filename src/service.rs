//! 业务层：录入流程与单词仓库
//!
//! 录入：校验 → 拼写建议 → 写入。拼写可疑时不写入，由调用方提示用户修改。

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::advisor::{DatamuseSource, SpellCheck, SpellingAdvisor, SuggestionSource};
use crate::review::{FlashcardSession, QuizSession, ReviewConfig, SpellingSession};
use crate::storage::{NewWord, StorageError, Word, WordFilter, WordId, WordStats, WordStore};

#[derive(Error, Debug)]
pub enum AddWordError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("请确认英文单词拼写正确: {word}")]
    PossibleMisspelling {
        word: String,
        suggestions: Vec<String>,
    },
}

pub struct VocabularyService<S = DatamuseSource> {
    store: Arc<WordStore>,
    advisor: SpellingAdvisor<S>,
    review: ReviewConfig,
}

impl<S: SuggestionSource> VocabularyService<S> {
    pub fn new(store: Arc<WordStore>, advisor: SpellingAdvisor<S>, review: ReviewConfig) -> Self {
        Self {
            store,
            advisor,
            review,
        }
    }

    pub fn store(&self) -> &Arc<WordStore> {
        &self.store
    }

    /// 录入新单词
    ///
    /// 空字段在任何 I/O 之前被拒绝；拼写可疑时不写入。
    pub async fn add_word(
        &self,
        word: &str,
        translation: &str,
        example: Option<&str>,
    ) -> Result<Word, AddWordError> {
        let new_word = NewWord::new(word, translation, example)?;

        let check = self.advisor.check(&new_word.word).await;
        if check.is_misspelled {
            info!(word = %new_word.word, "拼写可疑，未添加");
            return Err(AddWordError::PossibleMisspelling {
                word: new_word.word,
                suggestions: check.suggestions,
            });
        }

        Ok(self.store.insert(new_word).await?)
    }

    /// 输入过程中的拼写提示，不影响录入
    pub async fn live_check(&self, word: &str) -> SpellCheck {
        self.advisor.check(word).await
    }

    /// 单词仓库列表，按单词字母序
    pub async fn warehouse(&self, filter: WordFilter) -> Result<Vec<Word>, StorageError> {
        let mut words = self.store.get_all(filter).await?;
        sort_by_word(&mut words);
        Ok(words)
    }

    pub async fn search_warehouse(
        &self,
        query: &str,
        only_learned: bool,
    ) -> Result<Vec<Word>, StorageError> {
        let mut words = self.store.search(query, only_learned).await?;
        sort_by_word(&mut words);
        Ok(words)
    }

    /// 切换学习状态：已学会的重置为学习中，否则标记为已学会
    pub async fn toggle_learned(&self, id: WordId) -> Result<Word, StorageError> {
        let word = self.store.get(id).await?.ok_or(StorageError::NotFound(id))?;
        if word.learned {
            self.store.reset_learned(id).await
        } else {
            self.store.mark_learned(id).await
        }
    }

    pub async fn delete_word(&self, id: WordId) -> Result<(), StorageError> {
        self.store.delete(id).await
    }

    pub async fn stats(&self) -> Result<WordStats, StorageError> {
        self.store.stats().await
    }

    // ============================================================
    // 复习会话
    // ============================================================

    pub fn flashcard_session(&self) -> FlashcardSession {
        FlashcardSession::with_options(
            Arc::clone(&self.store),
            self.review.flashcard_batch,
            None,
        )
    }

    pub fn quiz_session(&self) -> QuizSession {
        QuizSession::with_options(
            Arc::clone(&self.store),
            self.review.quiz_batch,
            self.review.quiz_auto_learn_probability,
            None,
        )
    }

    pub fn spelling_session(&self) -> SpellingSession {
        SpellingSession::with_options(Arc::clone(&self.store), self.review.spelling_batch, None)
    }
}

fn sort_by_word(words: &mut [Word]) {
    words.sort_by(|a, b| a.word.cmp(&b.word));
}
