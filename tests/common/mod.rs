#![allow(dead_code)]

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use cart_api::{
    config::AppConfig,
    db,
    entities::{
        commerce::{ProductModel, WeightOptionModel},
        notification_profile,
    },
    services::commerce::{CreateProductInput, CreateWeightOptionInput},
    AppContext, AppState,
};
use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str =
    "cart_api_integration_suite_signing_key_0123456789_ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Helper harness for spinning up the full application against a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub user_id: Uuid,
    token: String,
    _context: AppContext,
    _db_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("cart_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.reminder.enabled = false;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let context = AppContext::with_connection(cfg, pool).expect("wire test context");
        let state = context.state();
        let router = context.router();

        let user_id = Uuid::new_v4();
        let token = state.auth.issue_token(user_id).expect("issue test token");

        Self {
            router,
            state,
            user_id,
            token,
            _context: context,
            _db_dir: db_dir,
        }
    }

    /// Bearer token for [`TestApp::user_id`].
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        self.state.auth.issue_token(user_id).expect("issue token")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        self.request_with_headers(method, uri, body, token, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for requests as the default user.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    pub async fn seed_product(&self, title: &str) -> ProductModel {
        self.state
            .catalog
            .create_product(CreateProductInput {
                title: title.to_string(),
                image: Some(format!("https://cdn.example.test/{}.png", title.to_lowercase())),
                description: Some(format!("{} seeded for integration tests", title)),
            })
            .await
            .expect("seed product")
    }

    pub async fn seed_weight(&self, label: &str) -> WeightOptionModel {
        self.state
            .catalog
            .create_weight_option(CreateWeightOptionInput {
                weight: label.to_string(),
                subscribe_price: dec!(180.00),
                normal_price: dec!(200.00),
                mrp_price: dec!(240.00),
            })
            .await
            .expect("seed weight option")
    }

    /// A product offered in each of `labels`, linked.
    pub async fn seed_catalog(
        &self,
        title: &str,
        labels: &[&str],
    ) -> (ProductModel, Vec<WeightOptionModel>) {
        let product = self.seed_product(title).await;
        let mut weights = Vec::with_capacity(labels.len());
        for label in labels {
            let weight = self.seed_weight(label).await;
            self.state
                .catalog
                .link_weight(product.id, weight.id)
                .await
                .expect("link weight");
            weights.push(weight);
        }
        (product, weights)
    }

    pub async fn add_device(&self, user_id: Uuid, player_id: &str, enabled: bool) {
        notification_profile::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            player_id: Set(player_id.to_string()),
            notifications_enabled: Set(enabled),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed notification profile");
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
