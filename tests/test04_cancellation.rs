use std::time::Duration;

use spanner_middleware::prelude::*;
use spanner_middleware::test_utils::MemoryExecutor;
use tokio_util::sync::CancellationToken;

const INSERT: &str = "INSERT INTO Singers (SingerId) VALUES (@id)";

#[tokio::test]
async fn cancelled_context_fails_before_executing() {
    let db = Db::new(MemoryExecutor::new());
    let token = CancellationToken::new();
    let ctx = ExecutionContext::with_cancellation(token.clone());
    token.cancel();

    let mut ids: Vec<i64> = Vec::new();
    let err = db
        .select(&ctx, &mut ids, "SELECT SingerId FROM Singers", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, SpannerMiddlewareError::Cancelled));
    assert!(db.executor().executed().is_empty());
}

#[tokio::test]
async fn cancellation_interrupts_a_running_query() {
    let db = Db::new(MemoryExecutor::new().with_latency(Duration::from_secs(30)));
    let ctx = db.context();

    let token = ctx.cancellation().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let err = db.ping(&ctx).await.unwrap_err();
    assert!(matches!(err, SpannerMiddlewareError::Cancelled));
}

#[tokio::test]
async fn cancellation_inside_pipeline_rolls_back() {
    let db = Db::new(MemoryExecutor::new());
    let ctx = db.context();
    let db_ref = &db;

    let err = db
        .tx_pipeline(&ctx, move |tx_ctx| async move {
            tx_ctx.cancellation().cancel();
            db_ref.exec(&tx_ctx, INSERT, &[RowValues::Int(1)]).await
        })
        .await
        .unwrap_err();

    assert!(matches!(err, SpannerMiddlewareError::Cancelled));
    assert!(db.executor().committed().is_empty());
    assert_eq!(db.executor().rolled_back().len(), 1);
    // the parent shares the token
    assert!(ctx.is_cancelled());
}
