//! 选择题模式
//!
//! 每题显示单词，给出 4 个翻译选项（1 个正确 + 3 个误导项）。
//! 答对后按概率自动标记为学会。

use std::collections::HashSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, warn};

use crate::review::{
    session_rng, transition, ReviewError, ReviewMode, ReviewResult, SessionPhase, StartOutcome,
    DEFAULT_QUIZ_AUTO_LEARN_PROBABILITY, DEFAULT_QUIZ_BATCH, QUIZ_DISTRACTORS, QUIZ_MIN_WORDS,
};
use crate::storage::{Word, WordFilter, WordStore};

/// 选项的显示标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionMark {
    #[default]
    None,
    Correct,
    Wrong,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOption {
    pub text: String,
    pub correct: bool,
    pub mark: OptionMark,
}

impl QuizOption {
    fn new(text: String, correct: bool) -> Self {
        Self {
            text,
            correct,
            mark: OptionMark::None,
        }
    }
}

/// 作答结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub correct: bool,
    pub selected: usize,
    pub correct_index: usize,
    /// 本次作答是否触发了自动标记学会
    pub auto_learned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub word: Word,
    pub options: Vec<QuizOption>,
    pub answer: Option<AnswerOutcome>,
}

impl QuizQuestion {
    pub fn is_answered(&self) -> bool {
        self.answer.is_some()
    }

    pub fn correct_index(&self) -> Option<usize> {
        self.options.iter().position(|o| o.correct)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizStep {
    /// 显示位于该位置的题目
    Showing(usize),
    Finished,
}

pub struct QuizSession {
    store: Arc<WordStore>,
    batch_size: usize,
    auto_learn_probability: f64,
    phase: SessionPhase,
    words: Vec<Word>,
    position: usize,
    question: Option<QuizQuestion>,
    correct_count: usize,
    rng: ChaCha8Rng,
}

impl QuizSession {
    pub fn new(store: Arc<WordStore>) -> Self {
        Self::with_options(
            store,
            DEFAULT_QUIZ_BATCH,
            DEFAULT_QUIZ_AUTO_LEARN_PROBABILITY,
            None,
        )
    }

    /// 概率超出 [0, 1] 时截断，批量至少为 1
    pub fn with_options(
        store: Arc<WordStore>,
        batch_size: usize,
        auto_learn_probability: f64,
        seed: Option<u64>,
    ) -> Self {
        let auto_learn_probability = if auto_learn_probability.is_nan() {
            0.0
        } else {
            auto_learn_probability.clamp(0.0, 1.0)
        };

        Self {
            store,
            batch_size: batch_size.max(1),
            auto_learn_probability,
            phase: SessionPhase::Idle,
            words: Vec::new(),
            position: 0,
            question: None,
            correct_count: 0,
            rng: session_rng(seed),
        }
    }

    /// 开始测验
    ///
    /// 活跃单词少于 4 个时不创建任何会话状态。
    pub async fn start(&mut self) -> ReviewResult<StartOutcome> {
        self.reset();

        let mut pool = self.store.get_all(WordFilter::Active).await?;
        if pool.is_empty() {
            return Ok(StartOutcome::NothingToReview);
        }
        if pool.len() < QUIZ_MIN_WORDS {
            return Ok(StartOutcome::InsufficientWords {
                required: QUIZ_MIN_WORDS,
                available: pool.len(),
            });
        }

        pool.shuffle(&mut self.rng);
        pool.truncate(self.batch_size);

        let Some(first) = pool.first() else {
            return Ok(StartOutcome::NothingToReview);
        };
        let first = self.build_question(first).await?;
        let size = pool.len();
        self.words = pool;
        self.question = Some(first);
        self.set_phase(SessionPhase::Active);

        Ok(StartOutcome::Started { size })
    }

    pub fn reset(&mut self) {
        self.words.clear();
        self.position = 0;
        self.question = None;
        self.correct_count = 0;
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

    /// 本轮答对的题数
    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    pub fn current(&self) -> Option<&QuizQuestion> {
        match self.phase {
            SessionPhase::Active => self.question.as_ref(),
            _ => None,
        }
    }

    /// 选择第 `index` 个选项
    pub async fn answer(&mut self, index: usize) -> ReviewResult<AnswerOutcome> {
        if self.phase != SessionPhase::Active {
            return Err(ReviewError::NotActive);
        }
        let question = self.question.as_ref().ok_or(ReviewError::NotActive)?;
        if question.is_answered() {
            return Err(ReviewError::AlreadyAnswered);
        }
        if index >= question.options.len() {
            return Err(ReviewError::InvalidOption(index));
        }

        let correct_index = question.correct_index().unwrap_or_default();
        let correct = index == correct_index;
        let word_id = question.word.id;

        let mut auto_learned = false;
        if correct {
            self.correct_count += 1;
            if self.rng.gen_bool(self.auto_learn_probability) {
                match self.store.mark_learned(word_id).await {
                    Ok(_) => {
                        debug!(id = word_id, "答对后自动标记为已学会");
                        auto_learned = true;
                    }
                    Err(e) => warn!(id = word_id, error = %e, "自动标记学会失败"),
                }
            }
        }

        let outcome = AnswerOutcome {
            correct,
            selected: index,
            correct_index,
            auto_learned,
        };

        if let Some(question) = self.question.as_mut() {
            question.options[correct_index].mark = OptionMark::Correct;
            if !correct {
                question.options[index].mark = OptionMark::Wrong;
            }
            question.answer = Some(outcome);
        }

        Ok(outcome)
    }

    /// 进入下一题，本题必须已作答
    pub async fn next(&mut self) -> ReviewResult<QuizStep> {
        if self.phase != SessionPhase::Active {
            return Err(ReviewError::NotActive);
        }
        let answered = self.question.as_ref().is_some_and(QuizQuestion::is_answered);
        if !answered {
            return Err(ReviewError::NotAnswered);
        }

        let position = self.position + 1;
        if position >= self.words.len() {
            self.set_phase(SessionPhase::Finished);
            return Ok(QuizStep::Finished);
        }

        // 构建失败时停留在当前题
        let word = self.words[position].clone();
        let question = self.build_question(&word).await?;
        self.position = position;
        self.question = Some(question);
        Ok(QuizStep::Showing(position))
    }

    /// 误导项每题重新从全部单词中抽取，排除当前单词
    async fn build_question(&mut self, word: &Word) -> ReviewResult<QuizQuestion> {
        let mut pool: Vec<Word> = self
            .store
            .get_all(WordFilter::All)
            .await?
            .into_iter()
            .filter(|w| w.id != word.id)
            .collect();
        pool.shuffle(&mut self.rng);

        let mut seen = HashSet::new();
        let distractors: Vec<String> = pool
            .into_iter()
            .map(|w| w.translation)
            .filter(|t| *t != word.translation && seen.insert(t.clone()))
            .take(QUIZ_DISTRACTORS)
            .collect();

        if distractors.len() < QUIZ_DISTRACTORS {
            debug!(
                id = word.id,
                available = distractors.len(),
                "误导项不足，选项数减少"
            );
        }

        let mut options = Vec::with_capacity(distractors.len() + 1);
        options.push(QuizOption::new(word.translation.clone(), true));
        options.extend(distractors.into_iter().map(|t| QuizOption::new(t, false)));
        options.shuffle(&mut self.rng);

        Ok(QuizQuestion {
            word: word.clone(),
            options,
            answer: None,
        })
    }

    fn set_phase(&mut self, next: SessionPhase) {
        transition(&self.store, ReviewMode::Quiz, &mut self.phase, next);
    }
}
