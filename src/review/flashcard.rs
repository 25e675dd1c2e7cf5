//! 抽卡片模式
//!
//! 随机抽取活跃单词作为固定工作集，逐张翻看；标记学会的单词从工作集中移除。

use std::sync::Arc;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::review::{
    session_rng, transition, ReviewError, ReviewMode, ReviewResult, SessionPhase, StartOutcome,
    DEFAULT_FLASHCARD_BATCH,
};
use crate::storage::{Word, WordStore};

/// 卡片朝向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardSide {
    #[default]
    Front,
    Back,
}

/// 导航或标记之后的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashcardStep {
    /// 显示位于该位置的卡片
    Showing(usize),
    /// 已到达边界，位置不变
    Unchanged,
    /// 会话结束
    Finished,
}

pub struct FlashcardSession {
    store: Arc<WordStore>,
    batch_size: usize,
    phase: SessionPhase,
    words: Vec<Word>,
    position: usize,
    side: CardSide,
    rng: ChaCha8Rng,
}

impl FlashcardSession {
    pub fn new(store: Arc<WordStore>) -> Self {
        Self::with_options(store, DEFAULT_FLASHCARD_BATCH, None)
    }

    pub fn with_options(store: Arc<WordStore>, batch_size: usize, seed: Option<u64>) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            phase: SessionPhase::Idle,
            words: Vec::new(),
            position: 0,
            side: CardSide::Front,
            rng: session_rng(seed),
        }
    }

    /// 开始复习：抽取最多 `batch_size` 个活跃单词
    pub async fn start(&mut self) -> ReviewResult<StartOutcome> {
        self.reset();

        let seed = self.rng.gen();
        let words = self
            .store
            .get_random_seeded(self.batch_size, true, seed)
            .await?;
        if words.is_empty() {
            return Ok(StartOutcome::NothingToReview);
        }

        let size = words.len();
        self.words = words;
        self.set_phase(SessionPhase::Active);
        Ok(StartOutcome::Started { size })
    }

    /// 回到 `Idle`，丢弃会话状态
    pub fn reset(&mut self) {
        self.words.clear();
        self.position = 0;
        self.side = CardSide::Front;
        self.set_phase(SessionPhase::Idle);
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.words.len()
    }

    pub fn side(&self) -> CardSide {
        self.side
    }

    /// 当前卡片
    pub fn current(&self) -> Option<&Word> {
        match self.phase {
            SessionPhase::Active => self.words.get(self.position),
            _ => None,
        }
    }

    /// 翻转卡片
    pub fn flip(&mut self) -> ReviewResult<CardSide> {
        self.ensure_active()?;
        self.side = match self.side {
            CardSide::Front => CardSide::Back,
            CardSide::Back => CardSide::Front,
        };
        Ok(self.side)
    }

    /// 上一张，已在第一张时不动
    pub fn prev(&mut self) -> ReviewResult<FlashcardStep> {
        self.ensure_active()?;
        if self.position == 0 {
            return Ok(FlashcardStep::Unchanged);
        }
        Ok(self.show(self.position - 1))
    }

    /// 下一张，最后一张时结束会话
    pub fn next(&mut self) -> ReviewResult<FlashcardStep> {
        self.ensure_active()?;
        if self.position + 1 < self.words.len() {
            return Ok(self.show(self.position + 1));
        }
        self.finish();
        Ok(FlashcardStep::Finished)
    }

    /// 将当前单词标记为学会并移出工作集
    ///
    /// 存储失败时会话保持不变。
    pub async fn mark_learned(&mut self) -> ReviewResult<FlashcardStep> {
        let id = self.current().ok_or(ReviewError::NotActive)?.id;

        self.store.mark_learned(id).await?;

        self.words.remove(self.position);
        if self.words.is_empty() {
            self.finish();
            return Ok(FlashcardStep::Finished);
        }

        let position = self.position.min(self.words.len() - 1);
        Ok(self.show(position))
    }

    fn show(&mut self, position: usize) -> FlashcardStep {
        self.position = position;
        self.side = CardSide::Front;
        FlashcardStep::Showing(position)
    }

    fn finish(&mut self) {
        self.set_phase(SessionPhase::Finished);
    }

    fn ensure_active(&self) -> ReviewResult<()> {
        match self.phase {
            SessionPhase::Active => Ok(()),
            _ => Err(ReviewError::NotActive),
        }
    }

    fn set_phase(&mut self, next: SessionPhase) {
        transition(&self.store, ReviewMode::Flashcard, &mut self.phase, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::test_support::store_with;
    use crate::storage::WordFilter;

    #[tokio::test]
    async fn test_start_with_no_words_stays_idle() {
        let (store, _) = store_with(&[]).await;
        let mut session = FlashcardSession::new(store);

        let outcome = session.start().await.unwrap();
        assert_eq!(outcome, StartOutcome::NothingToReview);
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn test_start_skips_learned_words() {
        let (store, words) = store_with(&[("cat", "貓"), ("dog", "狗")]).await;
        store.mark_learned(words[0].id).await.unwrap();

        let mut session = FlashcardSession::new(store);
        assert_eq!(session.start().await.unwrap(), StartOutcome::Started { size: 1 });
        assert_eq!(session.current().unwrap().word, "dog");
    }

    #[tokio::test]
    async fn test_batch_size_limits_working_set() {
        let (store, _) = store_with(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")]).await;
        let mut session = FlashcardSession::with_options(store, 3, Some(7));
        assert_eq!(session.start().await.unwrap(), StartOutcome::Started { size: 3 });
    }

    #[tokio::test]
    async fn test_zero_batch_draws_one_card() {
        let (store, _) = store_with(&[("cat", "貓"), ("dog", "狗")]).await;
        let mut session = FlashcardSession::with_options(store, 0, Some(7));
        assert_eq!(session.start().await.unwrap(), StartOutcome::Started { size: 1 });
        assert_eq!(session.next().unwrap(), FlashcardStep::Finished);
    }

    #[tokio::test]
    async fn test_navigation_clamps_and_finishes() {
        let (store, _) = store_with(&[("cat", "貓"), ("dog", "狗")]).await;
        let mut session = FlashcardSession::new(store);
        session.start().await.unwrap();

        assert_eq!(session.prev().unwrap(), FlashcardStep::Unchanged);
        assert_eq!(session.next().unwrap(), FlashcardStep::Showing(1));
        assert_eq!(session.prev().unwrap(), FlashcardStep::Showing(0));
        assert_eq!(session.next().unwrap(), FlashcardStep::Showing(1));
        assert_eq!(session.next().unwrap(), FlashcardStep::Finished);
        assert_eq!(session.phase(), SessionPhase::Finished);
        assert!(matches!(session.next(), Err(ReviewError::NotActive)));
    }

    #[tokio::test]
    async fn test_new_card_resets_side() {
        let (store, _) = store_with(&[("cat", "貓"), ("dog", "狗")]).await;
        let mut session = FlashcardSession::new(store);
        session.start().await.unwrap();

        assert_eq!(session.flip().unwrap(), CardSide::Back);
        session.next().unwrap();
        assert_eq!(session.side(), CardSide::Front);
        assert_eq!(session.flip().unwrap(), CardSide::Back);
        assert_eq!(session.flip().unwrap(), CardSide::Front);
    }

    #[tokio::test]
    async fn test_mark_learned_removes_from_working_set() {
        let (store, _) = store_with(&[("cat", "貓"), ("dog", "狗"), ("fox", "狐")]).await;
        let mut session = FlashcardSession::new(Arc::clone(&store));
        session.start().await.unwrap();

        // 移到最后一张后标记，位置应回落
        session.next().unwrap();
        session.next().unwrap();
        let last = session.current().unwrap().clone();
        assert_eq!(session.mark_learned().await.unwrap(), FlashcardStep::Showing(1));
        assert_eq!(session.remaining(), 2);
        assert!(store.get(last.id).await.unwrap().unwrap().learned);

        // 中间位置标记后留在原位
        session.prev().unwrap();
        assert_eq!(session.mark_learned().await.unwrap(), FlashcardStep::Showing(0));
        assert_eq!(session.mark_learned().await.unwrap(), FlashcardStep::Finished);
        assert_eq!(session.phase(), SessionPhase::Finished);

        assert!(store.get_all(WordFilter::Active).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_learned_failure_keeps_session() {
        let (store, _) = store_with(&[("cat", "貓"), ("dog", "狗")]).await;
        let mut session = FlashcardSession::new(Arc::clone(&store));
        session.start().await.unwrap();

        let id = session.current().unwrap().id;
        store.delete(id).await.unwrap();

        assert!(matches!(
            session.mark_learned().await,
            Err(ReviewError::Storage(_))
        ));
        assert_eq!(session.remaining(), 2);
        assert_eq!(session.phase(), SessionPhase::Active);
    }

    #[tokio::test]
    async fn test_restart_after_finish() {
        let (store, _) = store_with(&[("cat", "貓")]).await;
        let mut session = FlashcardSession::new(store);
        session.start().await.unwrap();
        assert_eq!(session.next().unwrap(), FlashcardStep::Finished);

        assert!(session.start().await.unwrap().is_started());
        assert_eq!(session.phase(), SessionPhase::Active);
        assert_eq!(session.position(), 0);
    }

    #[tokio::test]
    async fn test_phase_transitions_are_published() {
        let (store, _) = store_with(&[("cat", "貓")]).await;
        let mut rx = store.events().subscribe();
        let mut session = FlashcardSession::new(store);

        session.start().await.unwrap();
        session.next().unwrap();

        let phases: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|env| match env.event {
                crate::events::VocabEvent::SessionStateChanged { phase, .. } => Some(phase),
                _ => None,
            })
            .collect();
        assert_eq!(phases, vec![SessionPhase::Active, SessionPhase::Finished]);
    }
}
