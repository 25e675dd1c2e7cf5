//! Danci 离线背单词核心
//!
//! 本地单词存储、三种复习模式、拼写建议与录入流程。界面层通过
//! [`events::EventBus`] 订阅状态变化。

pub mod advisor;
pub mod config;
pub mod events;
pub mod logging;
pub mod review;
pub mod service;
pub mod storage;

pub use advisor::{AdvisorError, DatamuseSource, SpellCheck, SpellingAdvisor, SuggestionSource};
pub use config::Config;
pub use events::{EventBus, EventEnvelope, VocabEvent};
pub use review::{
    FlashcardSession, QuizSession, ReviewConfig, ReviewError, ReviewMode, SessionPhase,
    SpellingSession, StartOutcome,
};
pub use service::{AddWordError, VocabularyService};
pub use storage::{StorageError, Word, WordFilter, WordId, WordStats, WordStore};
