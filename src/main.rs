use std::process::ExitCode;
use std::sync::Arc;

use danci_vocab::advisor::{DatamuseSource, SpellingAdvisor};
use danci_vocab::config::Config;
use danci_vocab::logging;
use danci_vocab::service::VocabularyService;
use danci_vocab::storage::WordStore;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    let _log_guard = match logging::init_tracing(&config.log_level, config.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialise logging: {err}");
            None
        }
    };

    let store = Arc::new(WordStore::new(&config.db_path));
    if let Err(e) = store.open().await {
        tracing::error!(error = %e, path = %config.db_path.display(), "单词存储打开失败");
        return ExitCode::FAILURE;
    }

    match store.health().await {
        Ok(health) if health.is_healthy => {
            tracing::info!(schema_version = health.schema_version, "数据库健康检查通过");
        }
        Ok(health) => {
            tracing::warn!(
                schema_version = health.schema_version,
                missing_tables = ?health.missing_tables,
                needs_migration = health.needs_migration,
                "数据库状态异常"
            );
        }
        Err(e) => tracing::warn!(error = %e, "数据库健康检查失败"),
    }

    let advisor = SpellingAdvisor::new(DatamuseSource::new(config.advisor.clone()));
    let service = VocabularyService::new(Arc::clone(&store), advisor, config.review.clone());

    match service.stats().await {
        Ok(stats) => tracing::info!(
            total = stats.total,
            learned = stats.learned,
            active = stats.active,
            "单词统计"
        ),
        Err(e) => tracing::warn!(error = %e, "统计读取失败"),
    }

    store.close();
    ExitCode::SUCCESS
}
