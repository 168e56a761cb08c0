//! Criterion measurements for the per-call overhead of placeholder binding and row
//! mapping, plus a full `Db::select` round trip through the in-memory executor.

use std::hint::black_box;
use std::sync::LazyLock;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde::{Deserialize, Serialize};
use spanner_middleware::prelude::*;
use spanner_middleware::test_utils::{MemoryExecutor, create_result_set};
use tokio::runtime::Runtime;

const SELECT: &str = "SELECT SingerId, FirstName, LastName, Rating FROM Singers WHERE SingerId >= @min AND FirstName != @skip";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Singer {
    singer_id: i64,
    first_name: String,
    last_name: Option<String>,
    rating: f64,
}

static TOKIO_RUNTIME: LazyLock<Runtime> =
    LazyLock::new(|| Runtime::new().expect("create tokio runtime"));

/// Resolve how many rows each scan iteration maps.
fn bench_rows() -> usize {
    std::env::var("BENCH_ROWS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(1_000)
}

fn singer_rows(count: usize) -> ResultSet {
    let rows = (0..count)
        .map(|i| {
            vec![
                RowValues::Int(i as i64),
                RowValues::Text(format!("first-{i}")),
                if i % 3 == 0 {
                    RowValues::Null
                } else {
                    RowValues::Text(format!("last-{i}"))
                },
                RowValues::Float(i as f64 / 10.0),
            ]
        })
        .collect();
    create_result_set(&["SingerId", "FirstName", "LastName", "Rating"], rows)
}

fn bench_binding(c: &mut Criterion) {
    let mut group = c.benchmark_group("bind");
    let singer = Singer {
        singer_id: 1,
        first_name: "Marc".into(),
        last_name: Some("Richards".into()),
        rating: 4.5,
    };

    group.bench_function("positional", |b| {
        b.iter(|| {
            bind_positional(
                black_box(SELECT),
                black_box(&[RowValues::Int(10), RowValues::Text("Marc".into())]),
            )
        });
    });
    group.bench_function("structured", |b| {
        b.iter(|| {
            bind_structured(
                black_box("INSERT INTO Singers VALUES (@SingerId, @FirstName, @LastName, @Rating)"),
                black_box(&singer),
            )
        });
    });
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let rows = bench_rows();
    let rs = singer_rows(rows);
    let mut group = c.benchmark_group("scan_all");
    group.throughput(Throughput::Elements(rows as u64));

    group.bench_with_input(BenchmarkId::new("record", rows), &rs, |b, rs| {
        b.iter(|| {
            let mut singers: Vec<Singer> = Vec::with_capacity(rs.len());
            scan_all(&rs.results, &mut singers).expect("scan records");
            singers
        });
    });
    group.bench_with_input(BenchmarkId::new("tuple", rows), &rs, |b, rs| {
        b.iter(|| {
            let mut tuples: Vec<(i64, String, Option<String>, f64)> = Vec::new();
            scan_all(&rs.results, &mut tuples).expect("scan tuples");
            tuples
        });
    });
    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let rows = bench_rows();
    let executor = MemoryExecutor::new();
    executor.on_query(SELECT, singer_rows(rows));
    let db = Db::with_options(executor, DbOptions::default().with_log_statements(false));
    let ctx = db.context();

    c.bench_function("db_select", |b| {
        b.to_async(&*TOKIO_RUNTIME).iter(|| async {
            let mut singers: Vec<Singer> = Vec::new();
            db.select(
                &ctx,
                &mut singers,
                SELECT,
                &[RowValues::Int(0), RowValues::Text("nobody".into())],
            )
            .await
            .expect("select");
            singers
        });
    });
}

criterion_group!(benches, bench_binding, bench_scan, bench_select);
criterion_main!(benches);
