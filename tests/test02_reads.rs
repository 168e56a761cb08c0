use std::collections::HashMap;

use serde::Deserialize;
use spanner_middleware::config::DbOptions;
use spanner_middleware::prelude::*;
use spanner_middleware::test_utils::{MemoryExecutor, create_result_set};
use tokio::runtime::Runtime;

const SINGERS: &str = "SELECT SingerId, FirstName, LastName FROM Singers ORDER BY SingerId";

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct Singer {
    singer_id: i64,
    first_name: String,
    last_name: Option<String>,
}

fn seeded() -> MemoryExecutor {
    let executor = MemoryExecutor::new();
    executor.on_query(
        SINGERS,
        create_result_set(
            &["SingerId", "FirstName", "LastName"],
            vec![
                vec![
                    RowValues::Int(1),
                    RowValues::Text("Marc".into()),
                    RowValues::Text("Richards".into()),
                ],
                vec![
                    RowValues::Int(2),
                    RowValues::Text("Catalina".into()),
                    RowValues::Null,
                ],
            ],
        ),
    );
    executor
}

#[test]
fn select_maps_every_row_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let db = Db::new(seeded());
        let ctx = db.context();

        let mut singers: Vec<Singer> = Vec::new();
        db.select(&ctx, &mut singers, SINGERS, &[]).await?;
        assert_eq!(singers.len(), 2);
        assert_eq!(singers[0].first_name, "Marc");
        assert_eq!(singers[1].last_name, None);

        let mut rows: Vec<HashMap<String, RowValues>> = Vec::new();
        db.select(&ctx, &mut rows, SINGERS, &[]).await?;
        assert_eq!(rows[1]["FirstName"], RowValues::Text("Catalina".into()));

        let mut pairs: Vec<(i64, String, Option<String>)> = Vec::new();
        db.select(&ctx, &mut pairs, SINGERS, &[]).await?;
        assert_eq!(pairs[0], (1, "Marc".into(), Some("Richards".into())));
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn get_takes_the_first_row() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let db = Db::new(seeded());
        let ctx = db.context();

        let mut singer = Singer::default();
        db.get(&ctx, &mut singer, SINGERS, &[]).await?;
        assert_eq!(singer.singer_id, 1);
        assert_eq!(singer.last_name.as_deref(), Some("Richards"));
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn get_on_empty_result_is_no_rows() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let db = Db::new(MemoryExecutor::new());
        let ctx = db.context();

        let mut singer = Singer {
            singer_id: 42,
            ..Singer::default()
        };
        let err = db
            .get(
                &ctx,
                &mut singer,
                "SELECT * FROM Singers WHERE SingerId = @id",
                &[RowValues::Int(99)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SpannerMiddlewareError::NoRows));
        assert_eq!(singer.singer_id, 42);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn executor_failure_is_returned_unchanged() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let executor = seeded();
        executor.fail_on(SINGERS, "table Singers not found");
        let db = Db::new(executor);
        let ctx = db.context();

        let mut singers: Vec<Singer> = Vec::new();
        let err = db.select(&ctx, &mut singers, SINGERS, &[]).await.unwrap_err();
        match err {
            SpannerMiddlewareError::ExecutionError(msg) => {
                assert_eq!(msg, "table Singers not found");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(singers.is_empty());
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn query_returns_raw_rows() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let db = Db::new(seeded());
        let ctx = db.context();

        let rs = db.query(&ctx, SINGERS, &[]).await?;
        assert_eq!(rs.len(), 2);
        assert_eq!(
            rs.results[0].get("FirstName").and_then(RowValues::as_text),
            Some("Marc")
        );
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[tokio::test]
async fn open_validates_and_pings() {
    let ctx = ExecutionContext::background();
    let db = Db::open(&ctx, MemoryExecutor::new(), DbOptions::default())
        .await
        .unwrap();
    assert_eq!(db.executor().executed().len(), 1);
    assert_eq!(db.executor().executed()[0].statement.sql(), "SELECT 1");

    let bad = DbOptions::default().with_database("sandbox");
    let err = Db::open(&ctx, MemoryExecutor::new(), bad).await.err().unwrap();
    assert!(matches!(err, SpannerMiddlewareError::ConfigError(_)));
}

#[tokio::test]
async fn ping_zero_is_bad_connection() {
    let executor = MemoryExecutor::new();
    executor.on_query(
        "SELECT 1",
        create_result_set(&[""], vec![vec![RowValues::Int(0)]]),
    );
    let db = Db::new(executor);

    let err = db.ping(&db.context()).await.unwrap_err();
    assert!(matches!(err, SpannerMiddlewareError::BadConnection));
}

#[tokio::test]
async fn close_releases_the_executor() {
    let db = Db::new(MemoryExecutor::new());
    db.close().await.unwrap();
    assert!(db.executor().is_closed());

    let err = db.ping(&db.context()).await.unwrap_err();
    assert!(matches!(err, SpannerMiddlewareError::ConnectionError(_)));
}
