use std::sync::Arc;

use danci_vocab::storage::{run_migrations, WordFilter, WordStats, WordStore};
use tempfile::TempDir;

fn db_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("nested").join("vocabulary.db")
}

#[tokio::test]
async fn words_survive_restart() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);

    let learned_id = {
        let store = WordStore::new(&path);
        store.open().await.unwrap();
        store.add("cat", "貓", Some("The cat sleeps.")).await.unwrap();
        let dog = store.add("dog", "狗", None).await.unwrap();
        store.mark_learned(dog.id).await.unwrap();
        store.close();
        dog.id
    };

    let store = WordStore::new(&path);
    store.open().await.unwrap();

    assert_eq!(store.stats().await.unwrap(), WordStats::new(2, 1));
    let dog = store.get(learned_id).await.unwrap().unwrap();
    assert!(dog.learned);
    assert!(dog.last_reviewed.is_some());

    let active = store.get_all(WordFilter::Active).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].example, "The cat sleeps.");
}

#[tokio::test]
async fn duplicate_rejected_after_restart() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);

    let store = WordStore::new(&path);
    store.open().await.unwrap();
    store.add("cat", "貓", None).await.unwrap();
    store.close();

    let store = WordStore::new(&path);
    store.open().await.unwrap();
    assert!(store.add("cat", "猫", None).await.is_err());
    assert_eq!(store.stats().await.unwrap().total, 1);
}

#[tokio::test]
async fn reopen_does_not_rerun_migrations() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);

    let store = WordStore::new(&path);
    store.open().await.unwrap();
    let health = store.health().await.unwrap();
    assert!(health.is_healthy);
    store.close();

    let mut conn = rusqlite::Connection::open(&path).unwrap();
    let version = run_migrations(&mut conn).unwrap();
    assert_eq!(version, health.schema_version);

    let store = WordStore::new(&path);
    store.open().await.unwrap();
    let again = store.health().await.unwrap();
    assert_eq!(again.migration_count, health.migration_count);
}

#[tokio::test]
async fn concurrent_duplicate_adds_keep_one() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(WordStore::new(db_path(&dir)));
    store.open().await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.add("race", "競", None).await.is_ok() })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(store.stats().await.unwrap().total, 1);
}
