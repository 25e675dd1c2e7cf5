//! 存储层性质测试
//!
//! - 任意操作序列后 `active + learned == total`
//! - 重复添加失败且不改变单词数
//! - 随机抽取只返回活跃单词，数量为 min(count, 活跃数)

use proptest::prelude::*;

use danci_vocab::storage::{StorageError, WordStore};

#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    MarkLearned(usize),
    Reset(usize),
    Delete(usize),
}

const VOCAB: [&str; 6] = ["apple", "banana", "cherry", "date", "elder", "fig"];

fn arb_op() -> impl Strategy<Value = Op> {
    let idx = 0..VOCAB.len();
    prop_oneof![
        idx.clone().prop_map(Op::Add),
        idx.clone().prop_map(Op::MarkLearned),
        idx.clone().prop_map(Op::Reset),
        idx.prop_map(Op::Delete),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn id_of(store: &WordStore, word: &str) -> Option<i64> {
    store
        .search(word, false)
        .await
        .unwrap()
        .into_iter()
        .find(|w| w.word == word)
        .map(|w| w.id)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn stats_stay_consistent(ops in proptest::collection::vec(arb_op(), 1..40)) {
        runtime().block_on(async {
            let store = WordStore::in_memory();
            store.open().await.unwrap();

            for op in ops {
                match op {
                    Op::Add(i) => {
                        let before = store.stats().await.unwrap().total;
                        match store.add(VOCAB[i], "譯", None).await {
                            Ok(word) => assert_eq!(word.word, VOCAB[i]),
                            Err(StorageError::DuplicateWord(_)) => {
                                assert_eq!(store.stats().await.unwrap().total, before);
                            }
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                    Op::MarkLearned(i) => {
                        if let Some(id) = id_of(&store, VOCAB[i]).await {
                            assert!(store.mark_learned(id).await.unwrap().learned);
                        }
                    }
                    Op::Reset(i) => {
                        if let Some(id) = id_of(&store, VOCAB[i]).await {
                            let before = store.get(id).await.unwrap().unwrap().last_reviewed;
                            let word = store.reset_learned(id).await.unwrap();
                            assert!(!word.learned);
                            assert_eq!(word.last_reviewed, before);
                        }
                    }
                    Op::Delete(i) => {
                        if let Some(id) = id_of(&store, VOCAB[i]).await {
                            store.delete(id).await.unwrap();
                            assert!(store.get(id).await.unwrap().is_none());
                        }
                    }
                }

                let stats = store.stats().await.unwrap();
                assert_eq!(stats.active + stats.learned, stats.total);
            }
        });
    }

    #[test]
    fn random_sample_is_active_and_bounded(
        learned_mask in proptest::collection::vec(any::<bool>(), VOCAB.len()),
        count in 0usize..10,
    ) {
        runtime().block_on(async {
            let store = WordStore::in_memory();
            store.open().await.unwrap();

            for (word, learned) in VOCAB.iter().zip(&learned_mask) {
                let added = store.add(word, "譯", None).await.unwrap();
                if *learned {
                    store.mark_learned(added.id).await.unwrap();
                }
            }

            let active = learned_mask.iter().filter(|l| !**l).count();
            let sample = store.get_random(count, true).await.unwrap();
            assert_eq!(sample.len(), count.min(active));
            assert!(sample.iter().all(|w| !w.learned));

            let mut ids: Vec<_> = sample.iter().map(|w| w.id).collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), sample.len());
        });
    }
}
