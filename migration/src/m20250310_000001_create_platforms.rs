use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create platforms table
        manager
            .create_table(
                Table::create()
                    .table(Platforms::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Platforms::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Platforms::Name).string().not_null())
                    .col(
                        ColumnDef::new(Platforms::Slug)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Platforms::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Platforms::WebhookOnly)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Platforms::BaseCurrency)
                            .string()
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(Platforms::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Platforms::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create platform_credentials table
        manager
            .create_table(
                Table::create()
                    .table(PlatformCredentials::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PlatformCredentials::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PlatformCredentials::PlatformId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlatformCredentials::CredentialType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlatformCredentials::Secret)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlatformCredentials::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_platform_credentials_unique")
                    .table(PlatformCredentials::Table)
                    .col(PlatformCredentials::PlatformId)
                    .col(PlatformCredentials::CredentialType)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PlatformCredentials::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Platforms::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Platforms {
    Table,
    Id,
    Name,
    Slug,
    Enabled,
    WebhookOnly,
    BaseCurrency,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PlatformCredentials {
    Table,
    Id,
    PlatformId,
    CredentialType,
    Secret,
    CreatedAt,
}
