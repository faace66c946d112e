//! Benchmarks for parsing and statement execution.
//!
//! Execution benchmarks run against `InMemoryRowSource`, so they measure
//! predicate evaluation, relation batching and shaping rather than storage.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};
use siftql_core::schema::{Catalog, RelationMeta, TableBuilder};
use siftql_core::{ColumnType, InMemoryRowSource, Whitelist};
use siftql_functions::FunctionRegistry;
use siftql_query::{parse, Executor};
use tokio::runtime::Runtime;

/// Simple LCG for reproducible pseudo-random shuffling
fn shuffle_indices(count: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..count).collect();
    let mut s = seed;
    for i in (1..count).rev() {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        let j = (s as usize) % (i + 1);
        indices.swap(i, j);
    }
    indices
}

fn catalog() -> Catalog {
    let posts = TableBuilder::new("posts")
        .unwrap()
        .add_column("id", ColumnType::Number)
        .unwrap()
        .add_column("title", ColumnType::String)
        .unwrap()
        .add_column("author_id", ColumnType::Number)
        .unwrap()
        .add_column("tags", ColumnType::StringArray)
        .unwrap()
        .build()
        .unwrap();
    let users = TableBuilder::new("users")
        .unwrap()
        .add_column("id", ColumnType::Number)
        .unwrap()
        .add_column("name", ColumnType::String)
        .unwrap()
        .build()
        .unwrap();
    Catalog::builder()
        .table(posts)
        .unwrap()
        .table(users)
        .unwrap()
        .relation(RelationMeta::new("posts", "author_id", "users", "id"))
        .unwrap()
        .build()
}

fn source(count: usize) -> InMemoryRowSource {
    let posts: Vec<Value> = shuffle_indices(count, 12345)
        .into_iter()
        .map(|i| {
            json!({
                "id": i,
                "title": format!("post {} about {}", i, if i % 3 == 0 { "rust" } else { "go" }),
                "author_id": i % 50,
                "tags": [format!("t{}", i % 7), format!("t{}", i % 11)],
            })
        })
        .collect();
    let users: Vec<Value> = (0..25)
        .map(|i| json!({"id": i, "name": format!("user_{}", i)}))
        .collect();
    InMemoryRowSource::new()
        .with_table("posts", posts)
        .with_table("users", users)
}

const QUERIES: &[(&str, &str)] = &[
    ("filter", r#"[Where posts:title ("rust")]"#),
    ("list", r#"[Where posts:tags ("t1" "~t2" "~t3" "-t4")]"#),
    ("relation", "[COUNT() Where posts -> users]"),
    (
        "variables",
        r#"$rust = [Where posts:title ("rust")] AS author_id; [Where posts:author_id ($rust)] AS * | @limit(10)"#,
    ),
];

fn bench_parse(c: &mut Criterion) {
    let catalog = catalog();
    let mut group = c.benchmark_group("parse");

    for (name, text) in QUERIES {
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| black_box(parse(text, &catalog).unwrap()))
        });
    }
    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let catalog = catalog();
    let whitelist = Whitelist::new().allow_all("posts").allow_all("users");
    let registry = FunctionRegistry::with_builtins();
    let mut group = c.benchmark_group("execute");

    for size in [1_000usize, 10_000] {
        let source = source(size);
        let executor = Executor::new(&catalog, &whitelist, &source, &registry);
        for (name, text) in QUERIES {
            let statements = parse(text, &catalog).unwrap();
            group.bench_with_input(
                BenchmarkId::new(*name, size),
                &statements,
                |b, statements| {
                    b.to_async(&runtime)
                        .iter(|| async { black_box(executor.execute_query(statements, None).await.unwrap()) })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_execute);
criterion_main!(benches);
