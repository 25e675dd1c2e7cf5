//! 拼写练习模式
//!
//! 只显示翻译，用户输入拼写。答对或查看答案后才能进入下一题，
//! 本模式不会修改学习状态。

use std::sync::Arc;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::review::{
    session_rng, transition, ReviewError, ReviewMode, ReviewResult, SessionPhase, StartOutcome,
    DEFAULT_SPELLING_BATCH,
};
use crate::storage::{Word, WordStore};

/// 去除首尾空白后不区分大小写比较
pub fn spelling_matches(input: &str, word: &str) -> bool {
    input.trim().to_lowercase() == word.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpellingVerdict {
    Correct,
    Incorrect,
}

/// 当前拼写题
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellingQuestion {
    #[serde(skip)]
    word: Word,
    input: String,
    locked: bool,
    revealed: bool,
    attempts: u32,
    verdict: Option<SpellingVerdict>,
}

impl SpellingQuestion {
    fn new(word: Word) -> Self {
        Self {
            word,
            input: String::new(),
            locked: false,
            revealed: false,
            attempts: 0,
            verdict: None,
        }
    }

    pub fn translation(&self) -> &str {
        &self.word.translation
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// 答对或查看答案后锁定
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// 查看答案后才返回拼写
    pub fn revealed(&self) -> Option<&str> {
        self.revealed.then_some(self.word.word.as_str())
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn verdict(&self) -> Option<SpellingVerdict> {
        self.verdict
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpellingStep {
    Showing(usize),
    Finished,
}

pub struct SpellingSession {
    store: Arc<WordStore>,
    batch_size: usize,
    phase: SessionPhase,
    words: Vec<Word>,
    position: usize,
    question: Option<SpellingQuestion>,
    rng: ChaCha8Rng,
}

impl SpellingSession {
    pub fn new(store: Arc<WordStore>) -> Self {
        Self::with_options(store, DEFAULT_SPELLING_BATCH, None)
    }

    pub fn with_options(store: Arc<WordStore>, batch_size: usize, seed: Option<u64>) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            phase: SessionPhase::Idle,
            words: Vec::new(),
            position: 0,
            question: None,
            rng: session_rng(seed),
        }
    }

    pub async fn start(&mut self) -> ReviewResult<StartOutcome> {
        self.reset();

        let seed = self.rng.gen();
        let words = self
            .store
            .get_random_seeded(self.batch_size, true, seed)
            .await?;
        let Some(first) = words.first().cloned() else {
            return Ok(StartOutcome::NothingToReview);
        };

        let size = words.len();
        self.words = words;
        self.question = Some(SpellingQuestion::new(first));
        self.set_phase(SessionPhase::Active);
        Ok(StartOutcome::Started { size })
    }

    pub fn reset(&mut self) {
        self.words.clear();
        self.position = 0;
        self.question = None;
        self.set_phase(SessionPhase::Idle);
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn current(&self) -> Option<&SpellingQuestion> {
        match self.phase {
            SessionPhase::Active => self.question.as_ref(),
            _ => None,
        }
    }

    /// 更新输入内容
    pub fn set_input(&mut self, text: &str) -> ReviewResult<()> {
        let question = self.editable_question()?;
        question.input = text.to_string();
        Ok(())
    }

    /// 检查当前输入，答错可无限次重试
    pub fn check(&mut self) -> ReviewResult<SpellingVerdict> {
        let question = self.editable_question()?;
        question.attempts += 1;

        let verdict = if spelling_matches(&question.input, &question.word.word) {
            question.locked = true;
            SpellingVerdict::Correct
        } else {
            SpellingVerdict::Incorrect
        };
        question.verdict = Some(verdict);
        Ok(verdict)
    }

    /// 显示正确拼写并填入输入框，解锁下一题
    pub fn show_answer(&mut self) -> ReviewResult<String> {
        let question = self.active_question()?;
        question.input = question.word.word.clone();
        question.revealed = true;
        question.locked = true;
        Ok(question.word.word.clone())
    }

    pub fn next(&mut self) -> ReviewResult<SpellingStep> {
        if !self.active_question()?.locked {
            return Err(ReviewError::NotReady);
        }

        let position = self.position + 1;
        match self.words.get(position).cloned() {
            Some(word) => {
                self.position = position;
                self.question = Some(SpellingQuestion::new(word));
                Ok(SpellingStep::Showing(position))
            }
            None => {
                self.set_phase(SessionPhase::Finished);
                Ok(SpellingStep::Finished)
            }
        }
    }

    fn active_question(&mut self) -> ReviewResult<&mut SpellingQuestion> {
        if self.phase != SessionPhase::Active {
            return Err(ReviewError::NotActive);
        }
        self.question.as_mut().ok_or(ReviewError::NotActive)
    }

    fn editable_question(&mut self) -> ReviewResult<&mut SpellingQuestion> {
        let question = self.active_question()?;
        if question.locked {
            return Err(ReviewError::InputLocked);
        }
        Ok(question)
    }

    fn set_phase(&mut self, next: SessionPhase) {
        transition(&self.store, ReviewMode::Spelling, &mut self.phase, next);
    }
}
