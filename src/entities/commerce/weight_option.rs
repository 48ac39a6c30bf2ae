use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchasable product variant ("weight option") with its three price tiers.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "weight_options")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub weight: String,
    // Migrations create NUMERIC(19, 4) on Postgres and (16, 4) on SQLite.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub subscribe_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub normal_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub mrp_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_weight::Entity")]
    ProductWeights,
}

impl Related<super::product_weight::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductWeights.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
