use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// Dedup keys for the idempotent upsert paths. Every canonical entity is
// addressed by (platform_id, external_id) at the storage layer.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, platform_col, external_col) in [
            (
                "idx_customers_platform_external",
                "customers",
                "platform_id",
                "external_id",
            ),
            (
                "idx_products_platform_external",
                "products",
                "platform_id",
                "external_id",
            ),
            (
                "idx_subscriptions_platform_external",
                "subscriptions",
                "platform_id",
                "external_id",
            ),
            (
                "idx_transactions_platform_external",
                "transactions",
                "platform_id",
                "external_id",
            ),
            (
                "idx_affiliates_platform_external",
                "affiliates",
                "platform_id",
                "external_id",
            ),
            (
                "idx_orders_platform_external",
                "orders",
                "platform_id",
                "external_id",
            ),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Alias::new(table))
                        .col(Alias::new(platform_col))
                        .col(Alias::new(external_col))
                        .unique()
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_index(
                Index::create()
                    .name("idx_transaction_allocations_txn")
                    .table(Alias::new("transaction_allocations"))
                    .col(Alias::new("transaction_id"))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table) in [
            ("idx_customers_platform_external", "customers"),
            ("idx_products_platform_external", "products"),
            ("idx_subscriptions_platform_external", "subscriptions"),
            ("idx_transactions_platform_external", "transactions"),
            ("idx_affiliates_platform_external", "affiliates"),
            ("idx_orders_platform_external", "orders"),
            ("idx_transaction_allocations_txn", "transaction_allocations"),
        ] {
            manager
                .drop_index(Index::drop().name(name).table(Alias::new(table)).to_owned())
                .await?;
        }
        Ok(())
    }
}
