//! 复习引擎
//!
//! 三种复习模式各自是一个独立的会话对象（状态机）：
//! `Idle → Active → Finished`，重新开始时回到 `Idle`。
//! 会话状态只属于持有它的调用方，不做全局共享。

pub mod flashcard;
pub mod quiz;
pub mod spelling;

pub use flashcard::{CardSide, FlashcardSession, FlashcardStep};
pub use quiz::{AnswerOutcome, OptionMark, QuizOption, QuizQuestion, QuizSession, QuizStep};
pub use spelling::{spelling_matches, SpellingQuestion, SpellingSession, SpellingStep, SpellingVerdict};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::events::VocabEvent;
use crate::storage::{StorageError, WordStore};

/// 抽卡片模式默认单词数
pub const DEFAULT_FLASHCARD_BATCH: usize = 20;
/// 选择题模式默认题数
pub const DEFAULT_QUIZ_BATCH: usize = 10;
/// 拼写练习模式默认题数
pub const DEFAULT_SPELLING_BATCH: usize = 15;
/// 答对后自动标记为学会的默认概率
pub const DEFAULT_QUIZ_AUTO_LEARN_PROBABILITY: f64 = 0.3;
/// 选择题模式至少需要的活跃单词数
pub const QUIZ_MIN_WORDS: usize = 4;
/// 每道选择题的误导选项数
pub const QUIZ_DISTRACTORS: usize = 3;

/// 复习模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewMode {
    Flashcard,
    Quiz,
    Spelling,
}

/// 会话阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    #[default]
    Idle,
    Active,
    Finished,
}

/// 开始复习的结果
///
/// 没有可复习的单词或单词数量不足不是错误，会话保持 `Idle`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { size: usize },
    NothingToReview,
    InsufficientWords { required: usize, available: usize },
}

impl StartOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started { .. })
    }
}

/// 复习引擎错误类型
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("当前没有进行中的复习")]
    NotActive,

    #[error("本题已作答")]
    AlreadyAnswered,

    #[error("请先作答再进入下一题")]
    NotAnswered,

    #[error("选项不存在: {0}")]
    InvalidOption(usize),

    #[error("输入已锁定")]
    InputLocked,

    #[error("尚未完成本题")]
    NotReady,
}

pub type ReviewResult<T> = Result<T, ReviewError>;

/// 复习参数
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewConfig {
    pub flashcard_batch: usize,
    pub quiz_batch: usize,
    pub spelling_batch: usize,
    /// 选择题答对后自动标记为学会的概率，取值 [0, 1]
    pub quiz_auto_learn_probability: f64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            flashcard_batch: DEFAULT_FLASHCARD_BATCH,
            quiz_batch: DEFAULT_QUIZ_BATCH,
            spelling_batch: DEFAULT_SPELLING_BATCH,
            quiz_auto_learn_probability: DEFAULT_QUIZ_AUTO_LEARN_PROBABILITY,
        }
    }
}

/// 会话随机数生成器，未指定种子时使用系统熵
pub(crate) fn session_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// 切换阶段并广播
pub(crate) fn transition(
    store: &WordStore,
    mode: ReviewMode,
    current: &mut SessionPhase,
    next: SessionPhase,
) {
    if *current == next {
        return;
    }

    debug!(?mode, from = ?*current, to = ?next, "复习会话状态变化");
    *current = next;
    store
        .events()
        .publish(VocabEvent::SessionStateChanged { mode, phase: next });
}
