use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Deletable, DeletionPolicy};

/// Cart line item entity.
///
/// At most one row exists per cart key `(owner_id, product_id, order_type, variant_id)`;
/// the unique index `uq_cart_items_cart_key` backs the insert-or-increment merge.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub product_id: Uuid,
    pub order_type: OrderType,
    pub variant_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::weight_option::Entity",
        from = "Column::VariantId",
        to = "super::weight_option::Column::Id"
    )]
    WeightOption,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::weight_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WeightOption.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Deletable for Entity {
    const POLICY: DeletionPolicy = DeletionPolicy::Hard;
}

/// Purchase mode a cart line belongs to.
///
/// Parsing is exact and case-sensitive: only `Normal` and `Subscription` are accepted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::EnumString,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum OrderType {
    #[sea_orm(string_value = "Normal")]
    Normal,
    #[sea_orm(string_value = "Subscription")]
    Subscription,
}
