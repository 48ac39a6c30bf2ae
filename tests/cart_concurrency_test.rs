//! Concurrent upserts against one cart key must not lose increments.

mod common;

use cart_api::{
    entities::commerce::OrderType,
    services::commerce::{CartItemRequest, UpsertCartInput},
};
use common::TestApp;
use futures::future::join_all;
use uuid::Uuid;

const WRITERS: usize = 16;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_upserts_sum_every_increment() {
    let app = TestApp::new().await;
    assert!(app.state.config.db_max_connections > 1);
    let (product, weights) = app.seed_catalog("Assam", &["250g"]).await;
    let owner = Uuid::new_v4();
    let variant_id = weights[0].id;

    let tasks = (0..WRITERS).map(|_| {
        let carts = app.state.carts.clone();
        tokio::spawn(async move {
            carts
                .upsert_items(
                    owner,
                    UpsertCartInput {
                        product_id: product.id,
                        order_type: OrderType::Normal,
                        items: vec![CartItemRequest {
                            variant_id,
                            quantity: 1,
                        }],
                    },
                )
                .await
        })
    });

    for result in join_all(tasks).await {
        let lines = result.expect("task panicked").expect("upsert failed");
        assert_eq!(lines.len(), 1);
    }

    let listed = app
        .state
        .carts
        .list_items(owner, OrderType::Normal)
        .await
        .expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].line.quantity, WRITERS as i32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_and_readers_never_see_lock_errors() {
    let app = TestApp::new().await;
    let (product, weights) = app.seed_catalog("Darjeeling", &["100g", "250g"]).await;
    let owner = Uuid::new_v4();

    let writes = (0..WRITERS).map(|i| {
        let carts = app.state.carts.clone();
        let variant_id = weights[i % 2].id;
        tokio::spawn(async move {
            carts
                .upsert_items(
                    owner,
                    UpsertCartInput {
                        product_id: product.id,
                        order_type: OrderType::Subscription,
                        items: vec![CartItemRequest {
                            variant_id,
                            quantity: 2,
                        }],
                    },
                )
                .await
                .map(|_| ())
        })
    });
    let reads = (0..WRITERS).map(|_| {
        let carts = app.state.carts.clone();
        tokio::spawn(async move {
            carts
                .list_items(owner, OrderType::Subscription)
                .await
                .map(|_| ())
        })
    });

    let (written, read) = tokio::join!(join_all(writes), join_all(reads));
    for result in written.into_iter().chain(read) {
        result.expect("task panicked").expect("cart call failed");
    }

    let listed = app
        .state
        .carts
        .list_items(owner, OrderType::Subscription)
        .await
        .expect("list");
    let total: i32 = listed.iter().map(|v| v.line.quantity).sum();
    assert_eq!(listed.len(), 2);
    assert_eq!(total, 2 * WRITERS as i32);
}
