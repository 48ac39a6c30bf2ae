//! Seed data script - populates the catalog with demo tea products
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - 4 products, each sellable in a subset of 3 weight options
//! - one demo user with an enabled notification device
//! - a bearer token for that user, printed at the end

use anyhow::{Context, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use cart_api::{
    auth::{AuthConfig, AuthService},
    config, db,
    entities::notification_profile,
    events,
    services::commerce::{CreateProductInput, CreateWeightOptionInput, ProductCatalogService},
};

const PRODUCTS: &[(&str, &str, &[&str])] = &[
    ("Assam Breakfast", "Malty black tea from upper Assam", &["100g", "250g", "500g"]),
    ("Darjeeling First Flush", "Light, floral spring harvest", &["100g", "250g"]),
    ("Nilgiri Frost", "Brisk winter-picked black tea", &["250g", "500g"]),
    ("Masala Chai Blend", "CTC black tea with whole spices", &["100g", "500g"]),
];

const WEIGHTS: &[(&str, Decimal, Decimal, Decimal)] = &[
    ("100g", dec!(199.00), dec!(220.00), dec!(250.00)),
    ("250g", dec!(449.00), dec!(499.00), dec!(560.00)),
    ("500g", dec!(849.00), dec!(940.00), dec!(1050.00)),
];

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    info!("=== Cart API Seed Data ===");

    let pool = db::establish_connection_from_app_config(&cfg).await?;
    db::run_migrations(&pool).await?;
    let pool = Arc::new(pool);

    let (event_sender, event_rx) = events::channel(cfg.event_channel_capacity);
    let event_task = tokio::spawn(events::process_events(event_rx));
    let catalog = ProductCatalogService::new(pool.clone(), Arc::new(event_sender));

    info!("Creating weight options...");
    let mut weight_ids = Vec::with_capacity(WEIGHTS.len());
    for (weight, subscribe, normal, mrp) in WEIGHTS {
        let option = catalog
            .create_weight_option(CreateWeightOptionInput {
                weight: weight.to_string(),
                subscribe_price: *subscribe,
                normal_price: *normal,
                mrp_price: *mrp,
            })
            .await?;
        weight_ids.push((*weight, option.id));
    }

    info!("Creating products...");
    for (title, description, weights) in PRODUCTS {
        let product = catalog
            .create_product(CreateProductInput {
                title: title.to_string(),
                image: None,
                description: Some(description.to_string()),
            })
            .await?;

        for (label, weight_id) in weight_ids.iter().filter(|(w, _)| weights.contains(w)) {
            catalog.link_weight(product.id, *weight_id).await?;
            info!("  {} / {} -> product {} weight {}", title, label, product.id, weight_id);
        }
    }

    let user_id = Uuid::new_v4();
    notification_profile::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        player_id: Set(format!("demo-device-{}", user_id.simple())),
        notifications_enabled: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(&*pool)
    .await?;

    let auth = AuthService::new(AuthConfig::from(&cfg));
    let token = auth.issue_token(user_id)?;

    drop(catalog);
    let _ = event_task.await;

    info!("=== Seed Data Complete ===");
    info!("Demo user: {}", user_id);
    info!("Try:");
    info!(
        "  curl -H 'Authorization: Bearer {}' http://{}:{}/cart/Normal",
        token, cfg.host, cfg.port
    );

    Ok(())
}
