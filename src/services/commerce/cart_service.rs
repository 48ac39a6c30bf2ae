use crate::{
    db::delete_where,
    entities::commerce::{
        cart_item, product, weight_option, CartItem, CartItemModel, OrderType, Product,
        WeightOption,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::commerce::ProductCatalogService,
};
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Shopping cart service.
///
/// A cart is the set of line items sharing an owner and an order type. Each
/// line is identified by its cart key (owner, product, order type, variant);
/// the `uq_cart_items_cart_key` index guarantees at most one row per key.
///
/// # Examples
///
/// ```ignore
/// let carts = CartService::new(db, event_sender);
///
/// let lines = carts
///     .upsert_items(owner_id, UpsertCartInput {
///         product_id,
///         order_type: OrderType::Normal,
///         items: vec![CartItemRequest { variant_id, quantity: 2 }],
///     })
///     .await?;
/// ```
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Merges a batch of variant quantities into the owner's cart.
    ///
    /// Requests for the same variant are collapsed by summing their quantities.
    /// The product, every variant, and every product/variant link are checked
    /// inside one transaction; any failure rolls back the whole call. Existing
    /// lines are incremented with a single `INSERT .. ON CONFLICT` statement so
    /// concurrent calls for the same cart key never lose an increment.
    ///
    /// Returns the post-merge lines in collapsed-request order.
    #[instrument(skip(self, input), fields(product_id = %input.product_id, order_type = %input.order_type))]
    pub async fn upsert_items(
        &self,
        owner_id: Uuid,
        input: UpsertCartInput,
    ) -> Result<Vec<CartItemModel>, ServiceError> {
        let collapsed = collapse_requests(&input.items)?;
        let started = Instant::now();

        let txn = self.db.begin().await?;
        match Self::merge_collapsed(&txn, owner_id, &input, &collapsed).await {
            Ok(lines) => {
                txn.commit().await?;
                counter!("cart_upsert.committed", 1);
                histogram!("cart_upsert.duration", started.elapsed());

                info!(
                    %owner_id,
                    lines = lines.len(),
                    "Cart upsert committed"
                );

                self.event_sender
                    .send_or_log(Event::CartItemsUpserted {
                        owner_id,
                        product_id: input.product_id,
                        order_type: input.order_type,
                        line_item_ids: lines.iter().map(|line| line.id).collect(),
                    })
                    .await;

                Ok(lines)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!("Cart upsert rollback failed: {}", rollback_err);
                }
                counter!("cart_upsert.rolled_back", 1);
                Err(e)
            }
        }
    }

    async fn merge_collapsed(
        txn: &DatabaseTransaction,
        owner_id: Uuid,
        input: &UpsertCartInput,
        collapsed: &[(Uuid, i32)],
    ) -> Result<Vec<CartItemModel>, ServiceError> {
        ProductCatalogService::find_active_product(txn, input.product_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        let mut lines = Vec::with_capacity(collapsed.len());
        for &(variant_id, quantity) in collapsed {
            ProductCatalogService::find_weight_option(txn, variant_id)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Weight option {} not found", variant_id))
                })?;

            if !ProductCatalogService::link_exists(txn, input.product_id, variant_id).await? {
                return Err(ServiceError::NotFound(format!(
                    "Invalid product and weight combination: product {} does not offer weight {}",
                    input.product_id, variant_id
                )));
            }

            let key = CartKey {
                owner_id,
                product_id: input.product_id,
                order_type: input.order_type,
                variant_id,
            };
            lines.push(Self::increment_line(txn, &key, quantity).await?);
        }

        Ok(lines)
    }

    /// Insert-or-increment on the cart key, then read the merged row back.
    async fn increment_line<C: ConnectionTrait>(
        conn: &C,
        key: &CartKey,
        quantity: i32,
    ) -> Result<CartItemModel, ServiceError> {
        let now = Utc::now();
        let line = cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(key.owner_id),
            product_id: Set(key.product_id),
            order_type: Set(key.order_type),
            variant_id: Set(key.variant_id),
            quantity: Set(quantity),
            created_at: Set(now),
            updated_at: Set(now),
        };

        CartItem::insert(line)
            .on_conflict(
                OnConflict::columns([
                    cart_item::Column::OwnerId,
                    cart_item::Column::ProductId,
                    cart_item::Column::OrderType,
                    cart_item::Column::VariantId,
                ])
                .value(
                    cart_item::Column::Quantity,
                    Expr::cust("cart_items.quantity + excluded.quantity"),
                )
                .update_column(cart_item::Column::UpdatedAt)
                .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        CartItem::find()
            .filter(key.condition())
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Cart line for weight {} vanished after upsert",
                    key.variant_id
                ))
            })
    }

    /// Lines of one cart joined with product and weight display data, oldest first.
    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        owner_id: Uuid,
        order_type: OrderType,
    ) -> Result<Vec<CartLineView>, ServiceError> {
        let db = &*self.db;

        let lines = CartItem::find()
            .filter(cart_item::Column::OwnerId.eq(owner_id))
            .filter(cart_item::Column::OrderType.eq(order_type))
            .order_by_asc(cart_item::Column::CreatedAt)
            .order_by_asc(cart_item::Column::Id)
            .all(db)
            .await?;

        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        let variant_ids: Vec<Uuid> = lines.iter().map(|l| l.variant_id).collect();

        // Retired products stay visible here; only new upserts reject them.
        let products: HashMap<Uuid, product::Model> = Product::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let weights: HashMap<Uuid, weight_option::Model> = WeightOption::find()
            .filter(weight_option::Column::Id.is_in(variant_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|w| (w.id, w))
            .collect();

        let mut views = Vec::with_capacity(lines.len());
        for line in lines {
            match (products.get(&line.product_id), weights.get(&line.variant_id)) {
                (Some(product), Some(weight)) => views.push(CartLineView {
                    product: ProductSummary::from(product),
                    weight: WeightSummary::from(weight),
                    line: CartLine::from(line),
                }),
                _ => warn!(line_id = %line.id, "Skipping cart line with missing catalog data"),
            }
        }

        Ok(views)
    }

    /// Deletes one line owned by `owner_id`. Lines of other owners look missing.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, owner_id: Uuid, line_item_id: Uuid) -> Result<(), ServiceError> {
        let removed = delete_where::<cart_item::Entity, _>(
            &*self.db,
            Condition::all()
                .add(cart_item::Column::Id.eq(line_item_id))
                .add(cart_item::Column::OwnerId.eq(owner_id)),
        )
        .await?;

        if removed == 0 {
            return Err(ServiceError::NotFound(format!(
                "Cart item {} not found",
                line_item_id
            )));
        }

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                owner_id,
                line_item_id,
            })
            .await;

        info!(%owner_id, %line_item_id, "Removed cart item");
        Ok(())
    }

    /// Distinct owners holding at least one cart line of any order type.
    pub async fn owners_with_items(&self) -> Result<Vec<Uuid>, ServiceError> {
        Ok(CartItem::find()
            .select_only()
            .column(cart_item::Column::OwnerId)
            .distinct()
            .order_by_asc(cart_item::Column::OwnerId)
            .into_tuple::<Uuid>()
            .all(&*self.db)
            .await?)
    }
}

struct CartKey {
    owner_id: Uuid,
    product_id: Uuid,
    order_type: OrderType,
    variant_id: Uuid,
}

impl CartKey {
    fn condition(&self) -> Condition {
        Condition::all()
            .add(cart_item::Column::OwnerId.eq(self.owner_id))
            .add(cart_item::Column::ProductId.eq(self.product_id))
            .add(cart_item::Column::OrderType.eq(self.order_type))
            .add(cart_item::Column::VariantId.eq(self.variant_id))
    }
}

/// Collapses requests by variant, summing quantities and keeping first-seen order.
pub fn collapse_requests(items: &[CartItemRequest]) -> Result<Vec<(Uuid, i32)>, ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::ValidationError(
            "weights must be a non-empty list".to_string(),
        ));
    }

    let mut positions: HashMap<Uuid, usize> = HashMap::with_capacity(items.len());
    let mut collapsed: Vec<(Uuid, i32)> = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        if item.validate().is_err() {
            return Err(ServiceError::ValidationError(format!(
                "weights[{}].quantity must be a positive integer",
                index
            )));
        }

        match positions.get(&item.variant_id) {
            Some(&pos) => {
                let total = &mut collapsed[pos].1;
                *total = total.checked_add(item.quantity).ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "weights[{}].quantity overflows the total for weight {}",
                        index, item.variant_id
                    ))
                })?;
            }
            None => {
                positions.insert(item.variant_id, collapsed.len());
                collapsed.push((item.variant_id, item.quantity));
            }
        }
    }

    Ok(collapsed)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CartItemRequest {
    pub variant_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertCartInput {
    pub product_id: Uuid,
    pub order_type: OrderType,
    pub items: Vec<CartItemRequest>,
}

/// Wire shape of one cart line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    #[serde(rename = "orderType")]
    pub order_type: OrderType,
    #[serde(rename = "weight_id")]
    pub variant_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CartItemModel> for CartLine {
    fn from(model: CartItemModel) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            order_type: model.order_type,
            variant_id: model.variant_id,
            quantity: model.quantity,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductSummary {
    pub id: Uuid,
    pub title: String,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl From<&product::Model> for ProductSummary {
    fn from(p: &product::Model) -> Self {
        Self {
            id: p.id,
            title: p.title.clone(),
            image: p.image.clone(),
            description: p.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeightSummary {
    pub id: Uuid,
    pub weight: String,
    pub subscribe_price: Decimal,
    pub normal_price: Decimal,
    pub mrp_price: Decimal,
}

impl From<&weight_option::Model> for WeightSummary {
    fn from(w: &weight_option::Model) -> Self {
        Self {
            id: w.id,
            weight: w.weight.clone(),
            subscribe_price: w.subscribe_price,
            normal_price: w.normal_price,
            mrp_price: w.mrp_price,
        }
    }
}

/// A cart line with the display data clients render.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartLine,
    pub product: ProductSummary,
    pub weight: WeightSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn req(variant_id: Uuid, quantity: i32) -> CartItemRequest {
        CartItemRequest {
            variant_id,
            quantity,
        }
    }

    #[test]
    fn duplicates_are_summed_in_first_seen_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let collapsed = collapse_requests(&[req(a, 2), req(b, 1), req(a, 3)]).unwrap();
        assert_eq!(collapsed, vec![(a, 5), (b, 1)]);
    }

    #[test]
    fn empty_request_list_is_rejected() {
        assert_matches!(
            collapse_requests(&[]),
            Err(ServiceError::ValidationError(msg)) if msg.contains("weights")
        );
    }

    #[test]
    fn non_positive_quantity_names_its_index() {
        let v = Uuid::new_v4();
        assert_matches!(
            collapse_requests(&[req(v, 1), req(v, 0)]),
            Err(ServiceError::ValidationError(msg)) if msg.contains("weights[1].quantity")
        );
    }

    #[test]
    fn overflowing_sum_is_rejected() {
        let v = Uuid::new_v4();
        assert_matches!(
            collapse_requests(&[req(v, i32::MAX), req(v, 1)]),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn cart_line_uses_wire_field_names() {
        let now = Utc::now();
        let line = CartLine {
            id: Uuid::nil(),
            product_id: Uuid::nil(),
            order_type: OrderType::Subscription,
            variant_id: Uuid::nil(),
            quantity: 4,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["orderType"], "Subscription");
        assert!(json.get("weight_id").is_some());
        assert!(json.get("variant_id").is_none());
    }

    proptest! {
        #[test]
        fn collapse_preserves_totals_per_variant(
            picks in prop::collection::vec((0usize..4, 1i32..1000), 1..40)
        ) {
            let variants: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
            let items: Vec<CartItemRequest> =
                picks.iter().map(|&(i, q)| req(variants[i], q)).collect();

            let collapsed = collapse_requests(&items).unwrap();

            let ids: std::collections::HashSet<Uuid> =
                collapsed.iter().map(|(id, _)| *id).collect();
            prop_assert_eq!(ids.len(), collapsed.len());

            for (id, total) in &collapsed {
                let expected: i32 = items
                    .iter()
                    .filter(|item| item.variant_id == *id)
                    .map(|item| item.quantity)
                    .sum();
                prop_assert_eq!(*total, expected);
            }
        }
    }
}
