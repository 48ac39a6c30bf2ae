//! HTTP-level tests for the cart endpoints.
//!
//! Tests cover:
//! - Authentication on every cart route
//! - Body validation messages
//! - Upsert, listing, and removal through the router
//! - Owner isolation and request id propagation

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use serde_json::json;
use uuid::Uuid;

// ==================== Authentication ====================

#[tokio::test]
async fn cart_routes_require_a_bearer_token() {
    let app = TestApp::new().await;

    for (method, uri) in [
        (Method::POST, "/cart".to_string()),
        (Method::GET, "/cart/Normal".to_string()),
        (Method::DELETE, format!("/cart/{}", Uuid::new_v4())),
    ] {
        let response = app.request(method.clone(), &uri, None, None).await;
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{} {} should reject anonymous callers",
            method,
            uri
        );

        let body = response_json(response).await;
        assert_eq!(body["ResponseCode"], "401");
        assert_eq!(body["Result"], "false");
    }
}

#[tokio::test]
async fn tampered_token_is_rejected() {
    let app = TestApp::new().await;
    let mut token = app.token().to_string();
    token.push('x');

    let response = app
        .request(Method::GET, "/cart/Normal", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "up");
    assert_eq!(body["checks"]["database"]["status"], "up");
}

// ==================== Upsert ====================

#[tokio::test]
async fn upsert_then_list_shows_merged_quantities() {
    let app = TestApp::new().await;
    let (product, weights) = app.seed_catalog("Assam", &["250g", "500g"]).await;

    let payload = json!({
        "product_id": product.id,
        "orderType": "Normal",
        "weights": [
            { "weight_id": weights[0].id, "quantity": 2 },
            { "weight_id": weights[1].id, "quantity": 1 },
            { "weight_id": weights[0].id, "quantity": 3 }
        ]
    });

    let response = app
        .request_authenticated(Method::POST, "/cart", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["ResponseCode"], "200");
    assert_eq!(body["Result"], "true");
    assert_eq!(body["ResponseMsg"], "Cart updated successfully");

    let lines = body["data"].as_array().expect("lines array");
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["weight_id"], weights[0].id.to_string());
    assert_eq!(lines[0]["quantity"], 5);
    assert_eq!(lines[0]["orderType"], "Normal");
    assert_eq!(lines[1]["weight_id"], weights[1].id.to_string());
    assert_eq!(lines[1]["quantity"], 1);

    // Same key again: quantities add up
    let again = json!({
        "product_id": product.id,
        "orderType": "Normal",
        "weights": [{ "weight_id": weights[0].id, "quantity": 4 }]
    });
    let response = app
        .request_authenticated(Method::POST, "/cart", Some(again))
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"][0]["quantity"], 9);
    assert_eq!(body["data"][0]["id"], lines[0]["id"]);

    let response = app
        .request_authenticated(Method::GET, "/cart/Normal", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["ResponseMsg"], "Cart items fetched successfully");
    let listed = body["data"].as_array().expect("listed lines");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["quantity"], 9);
    assert_eq!(listed[0]["product"]["title"], "Assam");
    assert_eq!(listed[0]["weight"]["weight"], "250g");
}

#[tokio::test]
async fn order_types_are_separate_carts() {
    let app = TestApp::new().await;
    let (product, weights) = app.seed_catalog("Nilgiri", &["100g"]).await;

    let payload = json!({
        "product_id": product.id,
        "orderType": "Subscription",
        "weights": [{ "weight_id": weights[0].id, "quantity": 1 }]
    });
    let response = app
        .request_authenticated(Method::POST, "/cart", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let normal = response_json(
        app.request_authenticated(Method::GET, "/cart/Normal", None)
            .await,
    )
    .await;
    assert_eq!(normal["ResponseMsg"], "Cart is empty");
    assert_eq!(normal["data"], json!([]));

    let subscription = response_json(
        app.request_authenticated(Method::GET, "/cart/Subscription", None)
            .await,
    )
    .await;
    assert_eq!(subscription["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn invalid_bodies_are_rejected_with_field_messages() {
    let app = TestApp::new().await;
    let (product, weights) = app.seed_catalog("Darjeeling", &["100g"]).await;

    let cases = [
        (json!({ "orderType": "Normal", "weights": [] }), "product_id is required"),
        (
            json!({ "product_id": product.id, "orderType": "Weekly", "weights": [{ "weight_id": weights[0].id, "quantity": 1 }] }),
            "orderType must be one of: Normal, Subscription",
        ),
        (
            json!({ "product_id": product.id, "orderType": "Normal", "weights": [] }),
            "weights must be a non-empty list",
        ),
        (
            json!({ "product_id": product.id, "orderType": "Normal", "weights": [{ "weight_id": weights[0].id, "quantity": 0 }] }),
            "weights[0].quantity must be a positive integer",
        ),
    ];

    for (payload, message) in cases {
        let response = app
            .request_authenticated(Method::POST, "/cart", Some(payload))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_json(response).await;
        assert_eq!(body["ResponseCode"], "400");
        assert_eq!(body["Result"], "false");
        assert_eq!(body["ResponseMsg"], message);
    }
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .request_with_headers(
            Method::POST,
            "/cart",
            None,
            Some(app.token()),
            &[("content-type", "application/json")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_catalog_ids_are_bad_requests() {
    let app = TestApp::new().await;
    let (product, weights) = app.seed_catalog("Oolong", &["100g"]).await;
    let unlinked = app.seed_weight("1kg").await;

    let missing_product = json!({
        "product_id": Uuid::new_v4(),
        "orderType": "Normal",
        "weights": [{ "weight_id": weights[0].id, "quantity": 1 }]
    });
    let response = app
        .request_authenticated(Method::POST, "/cart", Some(missing_product))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bad_combination = json!({
        "product_id": product.id,
        "orderType": "Normal",
        "weights": [
            { "weight_id": weights[0].id, "quantity": 1 },
            { "weight_id": unlinked.id, "quantity": 1 }
        ]
    });
    let response = app
        .request_authenticated(Method::POST, "/cart", Some(bad_combination))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["ResponseMsg"]
        .as_str()
        .unwrap_or_default()
        .contains("Invalid product and weight combination"));

    // The valid first entry must not have been written.
    let body = response_json(
        app.request_authenticated(Method::GET, "/cart/Normal", None)
            .await,
    )
    .await;
    assert_eq!(body["ResponseMsg"], "Cart is empty");
}

// ==================== Listing ====================

#[tokio::test]
async fn unknown_order_type_in_path_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(Method::GET, "/cart/Weekly", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(
        body["ResponseMsg"],
        "orderType must be one of: Normal, Subscription"
    );
}

// ==================== Removal ====================

#[tokio::test]
async fn remove_deletes_only_the_owners_line() {
    let app = TestApp::new().await;
    let (product, weights) = app.seed_catalog("Chai", &["250g"]).await;

    let payload = json!({
        "product_id": product.id,
        "orderType": "Normal",
        "weights": [{ "weight_id": weights[0].id, "quantity": 2 }]
    });
    let body = response_json(
        app.request_authenticated(Method::POST, "/cart", Some(payload))
            .await,
    )
    .await;
    let line_id = body["data"][0]["id"].as_str().expect("line id").to_string();
    let uri = format!("/cart/{}", line_id);

    // Another user cannot see or delete it
    let intruder = app.token_for(Uuid::new_v4());
    let response = app
        .request(Method::DELETE, &uri, None, Some(&intruder))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.request_authenticated(Method::DELETE, &uri, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["ResponseMsg"], "Cart item removed successfully");
    assert_eq!(body["data"]["id"], line_id);

    // Second delete finds nothing
    let response = app.request_authenticated(Method::DELETE, &uri, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["ResponseCode"], "404");
}

#[tokio::test]
async fn remove_requires_a_uuid() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(Method::DELETE, "/cart/not-a-uuid", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["ResponseMsg"], "id must be a valid UUID");
}

// ==================== Request ids ====================

#[tokio::test]
async fn request_id_is_echoed_or_generated() {
    let app = TestApp::new().await;

    let response = app
        .request_with_headers(
            Method::GET,
            "/cart/Normal",
            None,
            Some(app.token()),
            &[("x-request-id", "cart-test-123")],
        )
        .await;
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("cart-test-123")
    );

    let response = app.request(Method::GET, "/cart/Normal", None, None).await;
    let generated = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .expect("generated request id");
    assert!(!generated.is_empty());

    let body = response_json(response).await;
    assert_eq!(body["request_id"], generated);
}
