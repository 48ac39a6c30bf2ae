use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_catalog_tables::Migration),
            Box::new(m20240601_000002_create_cart_items_table::Migration),
            Box::new(m20240601_000003_create_notification_profiles_table::Migration),
        ]
    }
}

mod m20240601_000001_create_catalog_tables {
    use sea_orm_migration::prelude::*;
    use sea_orm_migration::sea_orm::DatabaseBackend;

    /// NUMERIC(19, 4) on Postgres; SQLite caps decimal precision at 16.
    fn price_column(manager: &SchemaManager, column: WeightOptions) -> ColumnDef {
        let mut def = ColumnDef::new(column);
        match manager.get_database_backend() {
            DatabaseBackend::Sqlite => def.decimal_len(16, 4),
            _ => def.decimal_len(19, 4),
        };
        def.not_null().to_owned()
    }

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Title).string().not_null())
                        .col(ColumnDef::new(Products::Image).string().null())
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::DeletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WeightOptions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WeightOptions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WeightOptions::Weight).string().not_null())
                        .col(&mut price_column(manager, WeightOptions::SubscribePrice))
                        .col(&mut price_column(manager, WeightOptions::NormalPrice))
                        .col(&mut price_column(manager, WeightOptions::MrpPrice))
                        .col(
                            ColumnDef::new(WeightOptions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductWeights::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductWeights::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductWeights::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ProductWeights::WeightId).uuid().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_weights_product_id")
                                .from(ProductWeights::Table, ProductWeights::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_weights_weight_id")
                                .from(ProductWeights::Table, ProductWeights::WeightId)
                                .to(WeightOptions::Table, WeightOptions::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_product_weights_product_weight")
                        .table(ProductWeights::Table)
                        .col(ProductWeights::ProductId)
                        .col(ProductWeights::WeightId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_title")
                        .table(Products::Table)
                        .col(Products::Title)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductWeights::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WeightOptions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Title,
        Image,
        Description,
        CreatedAt,
        UpdatedAt,
        DeletedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum WeightOptions {
        Table,
        Id,
        Weight,
        SubscribePrice,
        NormalPrice,
        MrpPrice,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductWeights {
        Table,
        Id,
        ProductId,
        WeightId,
    }
}

mod m20240601_000002_create_cart_items_table {
    use super::m20240601_000001_create_catalog_tables::{Products, WeightOptions};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_cart_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(CartItems::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(CartItems::OwnerId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::OrderType).string_len(20).not_null())
                        .col(ColumnDef::new(CartItems::VariantId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(CartItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CartItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_product_id")
                                .from(CartItems::Table, CartItems::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_variant_id")
                                .from(CartItems::Table, CartItems::VariantId)
                                .to(WeightOptions::Table, WeightOptions::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One row per (owner, product, order type, variant); upserts merge on this key.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_cart_items_cart_key")
                        .table(CartItems::Table)
                        .col(CartItems::OwnerId)
                        .col(CartItems::ProductId)
                        .col(CartItems::OrderType)
                        .col(CartItems::VariantId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_cart_items_owner_order_type")
                        .table(CartItems::Table)
                        .col(CartItems::OwnerId)
                        .col(CartItems::OrderType)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CartItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CartItems {
        Table,
        Id,
        OwnerId,
        ProductId,
        OrderType,
        VariantId,
        Quantity,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000003_create_notification_profiles_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_notification_profiles_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(NotificationProfiles::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(NotificationProfiles::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(NotificationProfiles::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(NotificationProfiles::PlayerId)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(NotificationProfiles::NotificationsEnabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(NotificationProfiles::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_notification_profiles_user_id")
                        .table(NotificationProfiles::Table)
                        .col(NotificationProfiles::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(NotificationProfiles::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum NotificationProfiles {
        Table,
        Id,
        UserId,
        PlayerId,
        NotificationsEnabled,
        CreatedAt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::commerce::{weight_option, WeightOption};
    use crate::test_support::memory_db;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use sea_orm::{ActiveModelTrait, EntityTrait, Set};
    use sea_orm_migration::MigratorTrait;
    use uuid::Uuid;

    #[tokio::test]
    async fn sqlite_schema_stores_prices() {
        let db = memory_db().await;
        let id = Uuid::new_v4();

        weight_option::ActiveModel {
            id: Set(id),
            weight: Set("250g".into()),
            subscribe_price: Set(dec!(449.25)),
            normal_price: Set(dec!(499.5)),
            mrp_price: Set(dec!(1049.75)),
            created_at: Set(Utc::now()),
        }
        .insert(&db)
        .await
        .expect("insert weight option");

        let stored = WeightOption::find_by_id(id)
            .one(&db)
            .await
            .expect("query")
            .expect("row exists");
        assert_eq!(stored.subscribe_price, dec!(449.25));
        assert_eq!(stored.normal_price, dec!(499.5));
        assert_eq!(stored.mrp_price, dec!(1049.75));

        let applied = Migrator::get_applied_migrations(&db)
            .await
            .expect("migration status");
        assert_eq!(applied.len(), Migrator::migrations().len());
    }
}
