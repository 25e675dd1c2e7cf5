use std::path::PathBuf;
use std::time::Duration;

use crate::advisor::{
    DatamuseConfig, DEFAULT_SUGGEST_ENDPOINT, DEFAULT_SUGGEST_MAX, DEFAULT_SUGGEST_TIMEOUT_MS,
};
use crate::review::ReviewConfig;

const DB_FILE_NAME: &str = "vocabulary.db";
const APP_DIR_NAME: &str = "danci";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_level: String,
    /// 启用文件日志时的目录
    pub log_dir: Option<PathBuf>,
    pub advisor: DatamuseConfig,
    pub review: ReviewConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let db_path = env_string("DANCI_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let log_dir = env_flag("ENABLE_FILE_LOGS").then(|| {
            env_string("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./logs"))
        });

        let advisor = DatamuseConfig {
            endpoint: env_string("DANCI_SUGGEST_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_SUGGEST_ENDPOINT.to_string()),
            timeout: Duration::from_millis(
                env_u64("DANCI_SUGGEST_TIMEOUT_MS").unwrap_or(DEFAULT_SUGGEST_TIMEOUT_MS),
            ),
            max_results: env_usize("DANCI_SUGGEST_MAX").unwrap_or(DEFAULT_SUGGEST_MAX),
        };

        let defaults = ReviewConfig::default();
        let review = ReviewConfig {
            flashcard_batch: env_batch("DANCI_FLASHCARD_BATCH").unwrap_or(defaults.flashcard_batch),
            quiz_batch: env_batch("DANCI_QUIZ_BATCH").unwrap_or(defaults.quiz_batch),
            spelling_batch: env_batch("DANCI_SPELLING_BATCH").unwrap_or(defaults.spelling_batch),
            quiz_auto_learn_probability: env_f64("DANCI_QUIZ_AUTO_LEARN_PROBABILITY")
                .filter(|p| !p.is_nan())
                .map(|p| p.clamp(0.0, 1.0))
                .unwrap_or(defaults.quiz_auto_learn_probability),
        };

        Self {
            db_path,
            log_level,
            log_dir,
            advisor,
            review,
        }
    }
}

/// `<数据目录>/danci/vocabulary.db`，取不到数据目录时放在当前目录下
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(DB_FILE_NAME)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str) -> bool {
    env_string(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse().ok()
}

fn env_usize(key: &str) -> Option<usize> {
    env_string(key)?.parse().ok()
}

/// 批量大小，0 视为未设置
fn env_batch(key: &str) -> Option<usize> {
    env_usize(key).filter(|n| *n > 0)
}

fn env_f64(key: &str) -> Option<f64> {
    env_string(key)?.trim().parse().ok()
}
