//! Generate-and-persist against a real (in-memory) SQLite store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use phonebook_api::{NewPhone, Phone, PhoneId, PhoneStore, StoreError, StoreFuture};
use phonebook_bulk::{GenerateError, Generator, GeneratorConfig};
use phonebook_store::SqliteStore;

/// Store wrapper that records every batch it receives and can be told to
/// reject inserts.
struct RecordingStore {
    inner: SqliteStore,
    batches: Mutex<Vec<usize>>,
    reject: AtomicBool,
}

impl RecordingStore {
    async fn new() -> Arc<Self> {
        let inner = SqliteStore::open_in_memory().expect("open store");
        inner.migrate().await.expect("migrate");
        Arc::new(Self {
            inner,
            batches: Mutex::new(Vec::new()),
            reject: AtomicBool::new(false),
        })
    }

    fn batches(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

impl PhoneStore for RecordingStore {
    fn migrate(&self) -> StoreFuture<'_, ()> {
        self.inner.migrate()
    }

    fn insert_batch(&self, phones: Vec<NewPhone>) -> StoreFuture<'_, usize> {
        self.batches.lock().unwrap().push(phones.len());
        if self.reject.load(Ordering::SeqCst) {
            return Box::pin(async { Err(StoreError::Unavailable("connection refused".into())) });
        }
        self.inner.insert_batch(phones)
    }

    fn create(&self, phone: NewPhone) -> StoreFuture<'_, Phone> {
        self.inner.create(phone)
    }

    fn get(&self, id: PhoneId) -> StoreFuture<'_, Option<Phone>> {
        self.inner.get(id)
    }

    fn update(&self, id: PhoneId, phone: NewPhone) -> StoreFuture<'_, Option<Phone>> {
        self.inner.update(id, phone)
    }

    fn delete(&self, id: PhoneId) -> StoreFuture<'_, bool> {
        self.inner.delete(id)
    }

    fn list(&self, offset: u64, limit: u64) -> StoreFuture<'_, Vec<Phone>> {
        self.inner.list(offset, limit)
    }

    fn count(&self) -> StoreFuture<'_, u64> {
        self.inner.count()
    }
}

fn config(workers: usize) -> GeneratorConfig {
    GeneratorConfig {
        workers,
        chunk_size: 16,
        ..GeneratorConfig::default()
    }
}

#[tokio::test]
async fn persists_200_in_one_transaction() {
    let store = RecordingStore::new().await;
    let generator = Generator::new(store.clone(), config(4)).unwrap();

    let report = generator.generate_and_persist(200).await.expect("generate");

    assert_eq!(report.persisted, 200);
    assert_eq!(store.batches(), vec![200]);
    assert_eq!(store.count().await.unwrap(), 200);

    let rows = store.list(0, 1000).await.unwrap();
    let ids: HashSet<_> = rows.iter().map(|p| p.id).collect();
    assert_eq!(ids.len(), 200, "ids must be unique");
    assert!(rows.iter().all(|p| p.number.starts_with("123456789")));
}

#[tokio::test]
async fn rejected_insert_leaves_nothing_behind() {
    let store = RecordingStore::new().await;
    store.reject.store(true, Ordering::SeqCst);
    let generator = Generator::new(store.clone(), config(4)).unwrap();

    for _ in 0..3 {
        let err = generator.generate_and_persist(50).await.unwrap_err();
        assert!(matches!(err, GenerateError::Persist(StoreError::Unavailable(_))), "{err}");
    }

    assert_eq!(store.batches(), vec![50, 50, 50]);
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn failure_mid_batch_rolls_back() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.migrate().await.unwrap();
    store
        .exec(
            "CREATE TRIGGER reject_row_31 BEFORE INSERT ON phones
             WHEN (SELECT COUNT(*) FROM phones) = 30
             BEGIN SELECT RAISE(ABORT, 'row rejected'); END;",
        )
        .unwrap();
    let generator = Generator::new(Arc::new(store.clone()), config(2)).unwrap();

    let err = generator.generate_and_persist(50).await.unwrap_err();
    assert!(matches!(err, GenerateError::Persist(_)));
    assert_eq!(store.count().await.unwrap(), 0);

    // A batch that stays under the trigger threshold still goes through.
    let report = generator.generate_and_persist(30).await.unwrap();
    assert_eq!(report.persisted, 30);
    assert_eq!(store.count().await.unwrap(), 30);
}

#[tokio::test]
async fn out_of_range_counts_never_reach_the_store() {
    let store = RecordingStore::new().await;
    let generator = Generator::new(
        store.clone(),
        GeneratorConfig {
            max_count: 500,
            ..config(2)
        },
    )
    .unwrap();

    let err = generator.generate_and_persist(0).await.unwrap_err();
    assert!(matches!(err, GenerateError::InvalidCount));
    assert!(err.is_rejected_input());

    let err = generator.generate_and_persist(501).await.unwrap_err();
    assert!(matches!(err, GenerateError::TooLarge { requested: 501, max: 500 }));

    assert!(store.batches().is_empty());
}

#[tokio::test]
async fn seeded_runs_match_across_pool_sizes() {
    let seeded = |workers| GeneratorConfig {
        seed: Some(2024),
        ..config(workers)
    };

    let a = RecordingStore::new().await;
    Generator::new(a.clone(), seeded(1)).unwrap().generate_and_persist(300).await.unwrap();

    let b = RecordingStore::new().await;
    Generator::new(b.clone(), seeded(8)).unwrap().generate_and_persist(300).await.unwrap();

    let numbers = |rows: Vec<Phone>| rows.into_iter().map(|p| p.number).collect::<Vec<_>>();
    assert_eq!(
        numbers(a.list(0, 1000).await.unwrap()),
        numbers(b.list(0, 1000).await.unwrap())
    );
}

#[tokio::test]
async fn concurrent_requests_each_commit_whole_batches() {
    let store = RecordingStore::new().await;
    let generator = Arc::new(Generator::new(store.clone(), config(3)).unwrap());

    let mut handles = Vec::new();
    for count in [10, 100, 250, 40] {
        let generator = generator.clone();
        handles.push(tokio::spawn(async move { generator.generate_and_persist(count).await }));
    }
    for h in handles {
        let report = h.await.unwrap().unwrap();
        assert!(report.workers <= 3, "{report:?}");
    }
    assert_eq!(generator.pool_size(), 3);

    let mut batches = store.batches();
    batches.sort_unstable();
    assert_eq!(batches, vec![10, 40, 100, 250]);
    assert_eq!(store.count().await.unwrap(), 400);
}
