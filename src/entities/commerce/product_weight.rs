use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sellability link: a weight option may only be carted for products it is linked to.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_weights")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub weight_id: Uuid,
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
        from = "Column::WeightId",
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
