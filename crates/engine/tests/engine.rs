//! Engine integration tests: JSON-loaded collaborators, caching and
//! configuration.

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::json;
use siftql_core::schema::Catalog;
use siftql_core::storage::StorageResult;
use siftql_core::{Error, InMemoryRowSource, Row, RowSource, StorageError, StorageFilter, Whitelist};
use siftql_engine::{Engine, EngineConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const CATALOG: &str = r#"{
    "tables": [
        {"name": "posts", "columns": [
            {"name": "id", "type": "number"},
            {"name": "title", "type": "string"},
            {"name": "author_id", "type": "number"}
        ]},
        {"name": "users", "columns": [
            {"name": "id", "type": "number"},
            {"name": "name", "type": "string"},
            {"name": "email", "type": "string", "optional": true}
        ]}
    ],
    "relations": [
        {"from_table": "posts", "to_table": "users", "from_keys": ["author_id"], "to_keys": ["id"]}
    ]
}"#;

const WHITELIST: &str = r#"{"posts": "*", "users": ["id", "name"]}"#;

/// Delegates to an in-memory source after a delay, failing the first
/// `failures` fetches.
struct SlowSource {
    inner: InMemoryRowSource,
    delay: Duration,
    failures: Mutex<usize>,
    fetches: AtomicUsize,
}

impl SlowSource {
    fn new() -> Self {
        Self {
            inner: InMemoryRowSource::new()
                .with_table(
                    "posts",
                    vec![
                        json!({"id": 1, "title": "Rust ownership", "author_id": 1}),
                        json!({"id": 2, "title": "Go channels", "author_id": 2}),
                        json!({"id": 3, "title": "Rust async", "author_id": 7}),
                    ],
                )
                .with_table(
                    "users",
                    vec![
                        json!({"id": 1, "name": "alice", "email": "a@example.com"}),
                        json!({"id": 2, "name": "bob"}),
                    ],
                ),
            delay: Duration::from_millis(50),
            failures: Mutex::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    fn failing(failures: usize) -> Self {
        let source = Self::new();
        *source.failures.lock() = failures;
        source
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RowSource for SlowSource {
    async fn find_rows(
        &self,
        table: &str,
        columns: &[String],
        filter: Option<&StorageFilter>,
    ) -> StorageResult<Vec<Row>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        {
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(StorageError::Backend("connection reset".into()));
            }
        }
        self.inner.find_rows(table, columns, filter).await
    }
}

fn engine(source: Arc<SlowSource>, config: EngineConfig) -> Engine {
    Engine::builder()
        .catalog(Catalog::from_json(CATALOG).unwrap())
        .whitelist(Whitelist::from_json(WHITELIST).unwrap())
        .source(source)
        .config(config)
        .build()
        .unwrap()
}

const RUST_POSTS: &str = r#"[Where posts:title ("rust")]"#;

#[tokio::test(start_paused = true)]
async fn test_execute_and_cache_hit() {
    let source = Arc::new(SlowSource::new());
    let engine = engine(source.clone(), EngineConfig::default());

    let first = engine.execute(RUST_POSTS, None).await.unwrap();
    assert_eq!(first.get("result"), Some(&json!([1, 3])));
    let second = engine.execute(RUST_POSTS, None).await.unwrap();
    assert_eq!(first, second);

    assert_eq!(source.fetches(), 1);
    let stats = engine.cache_stats();
    assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    assert_eq!(stats.hit_rate(), 0.5);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_batches_share_one_execution() {
    let source = Arc::new(SlowSource::new());
    let engine = engine(source.clone(), EngineConfig::default());

    let text = r#"$rust = [Where posts:title ("rust")] AS author_id; [Where posts -> users]"#;
    let outputs = join_all((0..8).map(|_| engine.execute(text, None))).await;

    // posts, posts again and one batched users lookup
    assert_eq!(source.fetches(), 3);
    for output in outputs {
        let output = output.unwrap();
        assert_eq!(output.get("rust"), Some(&json!([1, 7])));
        assert_eq!(output.get("result"), Some(&json!([1, 2])));
    }
    assert_eq!(engine.cache_stats().misses, 1);
    assert_eq!(engine.cache_stats().hits, 7);
}

#[tokio::test(start_paused = true)]
async fn test_failures_are_shared_then_evicted() {
    let source = Arc::new(SlowSource::failing(1));
    let engine = engine(source.clone(), EngineConfig::default());

    let results = join_all((0..3).map(|_| engine.execute(RUST_POSTS, None))).await;
    for result in results {
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Storage { .. }), "{:?}", err);
        assert_eq!(err.status_code(), 500);
    }
    assert_eq!(source.fetches(), 1);
    assert_eq!(engine.cache_stats().entries, 0);

    let output = engine.execute(RUST_POSTS, None).await.unwrap();
    assert_eq!(output.get("result"), Some(&json!([1, 3])));
    assert_eq!(source.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_entries_expire_after_ttl() {
    let source = Arc::new(SlowSource::new());
    let config = EngineConfig::from_json(r#"{"cache_ttl_secs": 60}"#).unwrap();
    let engine = engine(source.clone(), config);

    engine.execute(RUST_POSTS, None).await.unwrap();
    tokio::time::advance(Duration::from_secs(30)).await;
    engine.execute(RUST_POSTS, None).await.unwrap();
    assert_eq!(source.fetches(), 1);

    tokio::time::advance(Duration::from_secs(31)).await;
    engine.execute(RUST_POSTS, None).await.unwrap();
    assert_eq!(source.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_allowlist_is_part_of_the_key() {
    let source = Arc::new(SlowSource::new());
    let engine = engine(source.clone(), EngineConfig::default());

    let ab = vec!["posts".to_string(), "users".to_string()];
    let ba = vec!["users".to_string(), "posts".to_string()];
    assert_eq!(
        engine.cache_key(RUST_POSTS, Some(ab.as_slice())).unwrap(),
        engine.cache_key(RUST_POSTS, Some(ba.as_slice())).unwrap()
    );
    assert_ne!(
        engine.cache_key(RUST_POSTS, Some(ab.as_slice())).unwrap(),
        engine.cache_key(RUST_POSTS, None).unwrap()
    );

    engine.execute(RUST_POSTS, Some(ab.as_slice())).await.unwrap();
    engine.execute(RUST_POSTS, Some(ba.as_slice())).await.unwrap();
    assert_eq!(source.fetches(), 1);

    let only_users = vec!["users".to_string()];
    let err = engine
        .execute(RUST_POSTS, Some(only_users.as_slice()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AccessDenied { .. }));
    assert_eq!(source.fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_clear_cache_keys() {
    let source = Arc::new(SlowSource::new());
    let engine = engine(source.clone(), EngineConfig::default());

    engine.execute(RUST_POSTS, None).await.unwrap();
    engine.execute(r#"[Where users:name ("bob")] AS name"#, None).await.unwrap();
    assert_eq!(engine.cache_stats().entries, 2);

    assert_eq!(engine.clear_cache_key("~\"users\""), 1);
    assert_eq!(engine.cache_stats().entries, 1);

    let key = engine.cache_key(RUST_POSTS, None).unwrap();
    assert_eq!(engine.clear_cache_key(&key), 1);
    assert_eq!(engine.clear_cache_key(&key), 0);
    assert!(engine.cache_stats().entries == 0);

    engine.execute(RUST_POSTS, None).await.unwrap();
    engine.clear_cache();
    let stats = engine.cache_stats();
    assert_eq!((stats.hits, stats.misses, stats.entries), (0, 0, 0));
    engine.execute(RUST_POSTS, None).await.unwrap();
    assert_eq!(source.fetches(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_cache_always_executes() {
    let source = Arc::new(SlowSource::new());
    let config = EngineConfig::from_json(r#"{"cache_enabled": false}"#).unwrap();
    let engine = engine(source.clone(), config);

    engine.execute(RUST_POSTS, None).await.unwrap();
    engine.execute(RUST_POSTS, None).await.unwrap();
    assert_eq!(source.fetches(), 2);
    assert_eq!(engine.cache_stats().misses, 0);
    assert_eq!(engine.clear_cache_key(RUST_POSTS), 0);
}

#[tokio::test(start_paused = true)]
async fn test_whitelist_from_json_is_enforced() {
    let source = Arc::new(SlowSource::new());
    let engine = engine(source.clone(), EngineConfig::default());

    let err = engine
        .execute(r#"[Where users:email ("example")]"#, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AccessDenied { ref columns, .. } if columns == &vec!["email".to_string()]));
    assert_eq!(source.fetches(), 0);

    let err = engine.execute(r#"[Where comments ("x")]"#, None).await.unwrap_err();
    assert_eq!(err, Error::unknown_table("comments"));
}

#[tokio::test(start_paused = true)]
async fn test_skip_policy_from_config() {
    let source = Arc::new(SlowSource::new());
    let config = EngineConfig::from_json(r#"{"statement_errors": "skip"}"#).unwrap();
    let engine = engine(source.clone(), config);

    let output = engine
        .execute(
            r#"$broken = [Where posts ("rust")] | @pluck(title); $ok = [Where posts:title ("go")]"#,
            None,
        )
        .await
        .unwrap();
    assert_eq!(output.get("broken"), None);
    assert_eq!(output.get("ok"), Some(&json!([2])));
}

#[test]
fn test_builder_requires_collaborators() {
    let err = Engine::builder().build().err().unwrap();
    assert!(matches!(err, Error::Config { .. }));

    let err = Engine::builder()
        .catalog(Catalog::from_json(CATALOG).unwrap())
        .source(Arc::new(SlowSource::new()))
        .build()
        .err()
        .unwrap();
    assert_eq!(err, Error::config("engine requires a whitelist"));

    let engine = Engine::builder()
        .catalog(Catalog::from_json(CATALOG).unwrap())
        .whitelist(Whitelist::new())
        .source(Arc::new(SlowSource::new()))
        .build()
        .unwrap();
    assert!(engine.registry().contains("core.limit"));
    assert_eq!(engine.parse(RUST_POSTS).unwrap().len(), 1);
}
