use crate::{
    db::delete_where,
    entities::commerce::{
        product, product_weight, weight_option, Product, ProductModel, ProductWeight,
        ProductWeightModel, WeightOption, WeightOptionModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::{Validate, ValidationError};

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

/// Product catalog service for products, weight options and their sellability links
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Create a new product
    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;

        let now = Utc::now();
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title.trim().to_string()),
            image: Set(input.image),
            description: Set(input.description),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&*self.db)
        .await?;

        info!("Created product {}", product.id);
        Ok(product)
    }

    /// Create a purchasable weight option with its three price tiers
    #[instrument(skip(self))]
    pub async fn create_weight_option(
        &self,
        input: CreateWeightOptionInput,
    ) -> Result<WeightOptionModel, ServiceError> {
        input.validate()?;

        let option = weight_option::ActiveModel {
            id: Set(Uuid::new_v4()),
            weight: Set(input.weight.trim().to_string()),
            subscribe_price: Set(input.subscribe_price),
            normal_price: Set(input.normal_price),
            mrp_price: Set(input.mrp_price),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        info!("Created weight option {} ({})", option.id, option.weight);
        Ok(option)
    }

    /// Mark a weight option as sellable for a product.
    #[instrument(skip(self))]
    pub async fn link_weight(
        &self,
        product_id: Uuid,
        weight_id: Uuid,
    ) -> Result<ProductWeightModel, ServiceError> {
        let db = &*self.db;

        Self::find_active_product(db, product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
        Self::find_weight_option(db, weight_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Weight option {} not found", weight_id))
            })?;

        if Self::link_exists(db, product_id, weight_id).await? {
            return Err(ServiceError::Conflict(format!(
                "Weight option {} is already linked to product {}",
                weight_id, product_id
            )));
        }

        let link = product_weight::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            weight_id: Set(weight_id),
        }
        .insert(db)
        .await?;

        info!("Linked weight option {} to product {}", weight_id, product_id);
        Ok(link)
    }

    /// Loads a product unless it has been retired.
    pub async fn find_active_product<C: ConnectionTrait>(
        conn: &C,
        product_id: Uuid,
    ) -> Result<Option<ProductModel>, ServiceError> {
        Ok(Product::find_by_id(product_id)
            .filter(product::Column::DeletedAt.is_null())
            .one(conn)
            .await?)
    }

    pub async fn find_weight_option<C: ConnectionTrait>(
        conn: &C,
        weight_id: Uuid,
    ) -> Result<Option<WeightOptionModel>, ServiceError> {
        Ok(WeightOption::find_by_id(weight_id).one(conn).await?)
    }

    /// True when `weight_id` is sellable for `product_id`.
    pub async fn link_exists<C: ConnectionTrait>(
        conn: &C,
        product_id: Uuid,
        weight_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let link = ProductWeight::find()
            .filter(product_weight::Column::ProductId.eq(product_id))
            .filter(product_weight::Column::WeightId.eq(weight_id))
            .one(conn)
            .await?;
        Ok(link.is_some())
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        Self::find_active_product(&*self.db, product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Weight options sellable for a product, cheapest first
    #[instrument(skip(self))]
    pub async fn weight_options_for_product(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<WeightOptionModel>, ServiceError> {
        self.get_product(product_id).await?;

        Ok(WeightOption::find()
            .inner_join(ProductWeight)
            .filter(product_weight::Column::ProductId.eq(product_id))
            .order_by_asc(weight_option::Column::NormalPrice)
            .all(&*self.db)
            .await?)
    }

    /// Search live products by exact id or case-insensitive title substring.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        limit: Option<u64>,
    ) -> Result<Vec<ProductModel>, ServiceError> {
        let term = query.trim();
        if term.is_empty() {
            return Err(ServiceError::ValidationError(
                "search term must not be empty".to_string(),
            ));
        }

        let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
        let mut matches = Condition::any().add(
            Expr::expr(Func::lower(Expr::col((product::Entity, product::Column::Title))))
                .like(LikeExpr::new(pattern).escape('\\')),
        );
        if let Ok(id) = Uuid::parse_str(term) {
            matches = matches.add(product::Column::Id.eq(id));
        }

        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        Ok(Product::find()
            .filter(matches)
            .filter(product::Column::DeletedAt.is_null())
            .order_by_asc(product::Column::Title)
            .order_by_asc(product::Column::Id)
            .limit(limit)
            .all(&*self.db)
            .await?)
    }

    /// Retire a product. Existing cart lines keep it for display but new upserts reject it.
    #[instrument(skip(self))]
    pub async fn retire_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let retired = delete_where::<product::Entity, _>(
            &*self.db,
            Condition::all().add(product::Column::Id.eq(product_id)),
        )
        .await?;

        if retired == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found",
                product_id
            )));
        }

        self.event_sender
            .send_or_log(Event::ProductRetired {
                product_id,
                retired_at: Utc::now(),
            })
            .await;

        info!("Retired product {}", product_id);
        Ok(())
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn non_negative_price(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        return Err(ValidationError::new("negative_price"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub title: String,
    pub image: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateWeightOptionInput {
    #[validate(length(min = 1, max = 64, message = "weight must be 1-64 characters"))]
    pub weight: String,
    #[validate(custom = "non_negative_price")]
    pub subscribe_price: Decimal,
    #[validate(custom = "non_negative_price")]
    pub normal_price: Decimal,
    #[validate(custom = "non_negative_price")]
    pub mrp_price: Decimal,
}
