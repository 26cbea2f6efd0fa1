use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create customers table
        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Customers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Customers::PlatformId).uuid().not_null())
                    .col(ColumnDef::new(Customers::ExternalId).string().not_null())
                    .col(ColumnDef::new(Customers::Name).string())
                    .col(ColumnDef::new(Customers::Email).string())
                    .col(ColumnDef::new(Customers::Document).string())
                    .col(ColumnDef::new(Customers::Phone).string())
                    .col(ColumnDef::new(Customers::Street).string())
                    .col(ColumnDef::new(Customers::City).string())
                    .col(ColumnDef::new(Customers::State).string())
                    .col(ColumnDef::new(Customers::Country).string())
                    .col(ColumnDef::new(Customers::PostalCode).string())
                    .col(
                        ColumnDef::new(Customers::LifetimeSpend)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Customers::ExternalCreatedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Customers::Metadata).json())
                    .col(
                        ColumnDef::new(Customers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Customers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create products table
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::PlatformId).uuid().not_null())
                    .col(ColumnDef::new(Products::ExternalId).string().not_null())
                    .col(ColumnDef::new(Products::Name).string().not_null())
                    .col(
                        ColumnDef::new(Products::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create subscriptions table
        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscriptions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Subscriptions::PlatformId).uuid().not_null())
                    .col(ColumnDef::new(Subscriptions::CustomerId).uuid().not_null())
                    .col(ColumnDef::new(Subscriptions::ProductId).uuid())
                    .col(ColumnDef::new(Subscriptions::ExternalId).string().not_null())
                    .col(
                        ColumnDef::new(Subscriptions::ExternalCustomerId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Subscriptions::ExternalProductId).string())
                    .col(ColumnDef::new(Subscriptions::ExternalPriceId).string())
                    .col(
                        ColumnDef::new(Subscriptions::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Subscriptions::TrialStart).timestamp_with_time_zone())
                    .col(ColumnDef::new(Subscriptions::TrialEnd).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Subscriptions::Amount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::Currency)
                            .string()
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::BillingPeriod)
                            .string()
                            .not_null()
                            .default("month"),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::BillingInterval)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Subscriptions::StartedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Subscriptions::CurrentPeriodStart)
                            .timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(Subscriptions::CurrentPeriodEnd).timestamp_with_time_zone())
                    .col(ColumnDef::new(Subscriptions::NextBillingAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Subscriptions::CanceledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Subscriptions::Metadata).json())
                    .col(
                        ColumnDef::new(Subscriptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create transactions table
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::PlatformId).uuid().not_null())
                    .col(ColumnDef::new(Transactions::CustomerId).uuid().not_null())
                    .col(ColumnDef::new(Transactions::OrderId).uuid())
                    .col(ColumnDef::new(Transactions::ExternalId).string().not_null())
                    .col(ColumnDef::new(Transactions::ExternalCustomerId).string())
                    .col(ColumnDef::new(Transactions::ExternalSubscriptionId).string())
                    .col(ColumnDef::new(Transactions::ExternalInvoiceId).string())
                    .col(
                        ColumnDef::new(Transactions::TxnType)
                            .string()
                            .not_null()
                            .default("one_time_payment"),
                    )
                    .col(
                        ColumnDef::new(Transactions::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Transactions::Amount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Transactions::Currency)
                            .string()
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(Transactions::PaymentMethod)
                            .string()
                            .not_null()
                            .default("other"),
                    )
                    .col(ColumnDef::new(Transactions::ExternalCreatedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Transactions::PaidAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Transactions::RefundedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create transaction_allocations table
        manager
            .create_table(
                Table::create()
                    .table(TransactionAllocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransactionAllocations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TransactionAllocations::TransactionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionAllocations::SubscriptionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionAllocations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create affiliates table
        manager
            .create_table(
                Table::create()
                    .table(Affiliates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Affiliates::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Affiliates::PlatformId).uuid().not_null())
                    .col(ColumnDef::new(Affiliates::ExternalId).string().not_null())
                    .col(ColumnDef::new(Affiliates::Name).string())
                    .col(ColumnDef::new(Affiliates::Email).string())
                    .col(
                        ColumnDef::new(Affiliates::TotalSales)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Affiliates::TotalRevenue)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Affiliates::Tier)
                            .string()
                            .not_null()
                            .default("bronze"),
                    )
                    .col(
                        ColumnDef::new(Affiliates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Affiliates::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create orders table
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Orders::PlatformId).uuid().not_null())
                    .col(ColumnDef::new(Orders::CustomerId).uuid())
                    .col(ColumnDef::new(Orders::ExternalId).string().not_null())
                    .col(
                        ColumnDef::new(Orders::TotalAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Orders::Currency)
                            .string()
                            .not_null()
                            .default("USD"),
                    )
                    .col(ColumnDef::new(Orders::Status).string())
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Affiliates::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(TransactionAllocations::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
    PlatformId,
    ExternalId,
    Name,
    Email,
    Document,
    Phone,
    Street,
    City,
    State,
    Country,
    PostalCode,
    LifetimeSpend,
    ExternalCreatedAt,
    Metadata,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    PlatformId,
    ExternalId,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Subscriptions {
    Table,
    Id,
    PlatformId,
    CustomerId,
    ProductId,
    ExternalId,
    ExternalCustomerId,
    ExternalProductId,
    ExternalPriceId,
    Status,
    TrialStart,
    TrialEnd,
    Amount,
    Currency,
    BillingPeriod,
    BillingInterval,
    StartedAt,
    CurrentPeriodStart,
    CurrentPeriodEnd,
    NextBillingAt,
    CanceledAt,
    Metadata,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    PlatformId,
    CustomerId,
    OrderId,
    ExternalId,
    ExternalCustomerId,
    ExternalSubscriptionId,
    ExternalInvoiceId,
    TxnType,
    Status,
    Amount,
    Currency,
    PaymentMethod,
    ExternalCreatedAt,
    PaidAt,
    RefundedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum TransactionAllocations {
    Table,
    Id,
    TransactionId,
    SubscriptionId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Affiliates {
    Table,
    Id,
    PlatformId,
    ExternalId,
    Name,
    Email,
    TotalSales,
    TotalRevenue,
    Tier,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    PlatformId,
    CustomerId,
    ExternalId,
    TotalAmount,
    Currency,
    Status,
    CreatedAt,
}
