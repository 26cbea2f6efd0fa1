use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create sync_logs table
        manager
            .create_table(
                Table::create()
                    .table(SyncLogs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SyncLogs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SyncLogs::PlatformId).uuid().not_null())
                    .col(ColumnDef::new(SyncLogs::SyncType).string().not_null())
                    .col(
                        ColumnDef::new(SyncLogs::Status)
                            .string()
                            .not_null()
                            .default("running"),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(SyncLogs::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(SyncLogs::RecordsSynced)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::RecordsFailed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncLogs::MissingRecordsFound)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SyncLogs::ErrorDetails).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_logs_platform_started")
                    .table(SyncLogs::Table)
                    .col(SyncLogs::PlatformId)
                    .col(SyncLogs::StartedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncLogs {
    Table,
    Id,
    PlatformId,
    SyncType,
    Status,
    StartedAt,
    CompletedAt,
    RecordsSynced,
    RecordsFailed,
    MissingRecordsFound,
    ErrorDetails,
}
