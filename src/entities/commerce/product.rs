use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entities::{Deletable, DeletionPolicy};

/// Catalog product. Retired products keep their row with `deleted_at` set.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(nullable)]
    pub image: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_weight::Entity")]
    ProductWeights,
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItems,
}

impl Related<super::product_weight::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductWeights.def()
    }
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl Related<super::weight_option::Entity> for Entity {
    fn to() -> RelationDef {
        super::product_weight::Relation::WeightOption.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::product_weight::Relation::Product.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Deletable for Entity {
    const POLICY: DeletionPolicy = DeletionPolicy::Soft;

    fn deleted_at_column() -> Option<Column> {
        Some(Column::DeletedAt)
    }
}
