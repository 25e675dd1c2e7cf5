//! 拼写建议
//!
//! 录入新单词前查询外部词库，提示可能的拼写错误。
//! 查询失败时放行（视为拼写正确），不会阻止录入。

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_SUGGEST_ENDPOINT: &str = "https://api.datamuse.com";
pub const DEFAULT_SUGGEST_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_SUGGEST_MAX: usize = 5;
/// 实时输入时展示的建议数
pub const LIVE_HINT_COUNT: usize = 3;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("请求失败: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP 错误 {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),
}

/// 拼写检查结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellCheck {
    pub is_misspelled: bool,
    pub suggestions: Vec<String>,
}

impl SpellCheck {
    /// 未发现问题
    pub fn clean() -> Self {
        Self::default()
    }

    /// 按查询结果判定：无结果或首个结果与输入不同（忽略大小写）即视为拼写可疑
    pub fn from_suggestions(word: &str, suggestions: Vec<String>) -> Self {
        let is_misspelled = suggestions
            .first()
            .map_or(true, |top| top.to_lowercase() != word.to_lowercase());

        Self {
            is_misspelled,
            suggestions,
        }
    }

    pub fn hint(&self, n: usize) -> &[String] {
        &self.suggestions[..self.suggestions.len().min(n)]
    }
}

/// 拼写建议来源
pub trait SuggestionSource: Send + Sync {
    /// 返回按相关度排序的候选拼写
    fn suggest(&self, word: &str) -> impl Future<Output = Result<Vec<String>, AdvisorError>> + Send;
}

#[derive(Debug, Clone)]
pub struct DatamuseConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub max_results: usize,
}

impl Default for DatamuseConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SUGGEST_ENDPOINT.to_string(),
            timeout: Duration::from_millis(DEFAULT_SUGGEST_TIMEOUT_MS),
            max_results: DEFAULT_SUGGEST_MAX,
        }
    }
}

/// 其余字段（score 等）忽略
#[derive(Debug, Deserialize)]
struct DatamuseItem {
    word: String,
}

/// Datamuse `/words?sp=` 查询
#[derive(Clone)]
pub struct DatamuseSource {
    config: DatamuseConfig,
    client: reqwest::Client,
}

impl DatamuseSource {
    pub fn new(config: DatamuseConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, client }
    }

    pub fn config(&self) -> &DatamuseConfig {
        &self.config
    }

    fn url(&self) -> String {
        format!("{}/words", self.config.endpoint.trim().trim_end_matches('/'))
    }
}

impl Default for DatamuseSource {
    fn default() -> Self {
        Self::new(DatamuseConfig::default())
    }
}

impl SuggestionSource for DatamuseSource {
    async fn suggest(&self, word: &str) -> Result<Vec<String>, AdvisorError> {
        let max = self.config.max_results.to_string();
        let resp = self
            .client
            .get(self.url())
            .query(&[("sp", word), ("max", max.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AdvisorError::HttpStatus { status, body });
        }

        let body = resp.text().await?;
        parse_suggestions(&body)
    }
}

/// 解析 `[{"word": ..., "score": ...}]`
pub fn parse_suggestions(body: &str) -> Result<Vec<String>, AdvisorError> {
    let items: Vec<DatamuseItem> = serde_json::from_str(body)?;
    Ok(items.into_iter().map(|item| item.word).collect())
}

pub struct SpellingAdvisor<S = DatamuseSource> {
    source: S,
}

impl<S: SuggestionSource> SpellingAdvisor<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// 检查拼写，空输入不发起查询
    pub async fn check(&self, word: &str) -> SpellCheck {
        let word = word.trim();
        if word.is_empty() {
            return SpellCheck::clean();
        }

        match self.source.suggest(word).await {
            Ok(suggestions) => {
                let result = SpellCheck::from_suggestions(word, suggestions);
                debug!(word, misspelled = result.is_misspelled, "拼写检查完成");
                result
            }
            Err(e) => {
                warn!(word, error = %e, "拼写检查失败，按拼写正确处理");
                SpellCheck::clean()
            }
        }
    }
}

impl Default for SpellingAdvisor<DatamuseSource> {
    fn default() -> Self {
        Self::new(DatamuseSource::default())
    }
}
