// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::sync_log::{SyncLog, SyncStatus, SyncType};
use crate::domain::repositories::sync_log_repository::SyncLogRepository;
use crate::domain::repositories::webhook_event_repository::RepositoryError;
use crate::infrastructure::database::entities::sync_log as sync_log_entity;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 对账日志仓库实现
#[derive(Clone)]
pub struct SyncLogRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl SyncLogRepositoryImpl {
    /// 创建新的对账日志仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<sync_log_entity::Model> for SyncLog {
    fn from(model: sync_log_entity::Model) -> Self {
        Self {
            id: model.id,
            platform_id: model.platform_id,
            sync_type: model.sync_type.parse().unwrap_or(SyncType::Subscriptions),
            status: model.status.parse().unwrap_or(SyncStatus::Running),
            started_at: model.started_at.with_timezone(&Utc),
            completed_at: model.completed_at.map(|t| t.with_timezone(&Utc)),
            records_synced: model.records_synced,
            records_failed: model.records_failed,
            missing_records_found: model.missing_records_found,
            error_details: model.error_details,
        }
    }
}

impl From<SyncLog> for sync_log_entity::ActiveModel {
    fn from(log: SyncLog) -> Self {
        Self {
            id: Set(log.id),
            platform_id: Set(log.platform_id),
            sync_type: Set(log.sync_type.to_string()),
            status: Set(log.status.to_string()),
            started_at: Set(log.started_at.into()),
            completed_at: Set(log.completed_at.map(Into::into)),
            records_synced: Set(log.records_synced),
            records_failed: Set(log.records_failed),
            missing_records_found: Set(log.missing_records_found),
            error_details: Set(log.error_details),
        }
    }
}

#[async_trait]
impl SyncLogRepository for SyncLogRepositoryImpl {
    async fn create(&self, log: &SyncLog) -> Result<SyncLog, RepositoryError> {
        let model: sync_log_entity::ActiveModel = log.clone().into();

        model.insert(self.db.as_ref()).await?;
        Ok(log.clone())
    }

    async fn update(&self, log: &SyncLog) -> Result<SyncLog, RepositoryError> {
        let model: sync_log_entity::ActiveModel = log.clone().into();

        let updated = model.update(self.db.as_ref()).await?;
        Ok(updated.into())
    }

    async fn list_recent(
        &self,
        platform_id: Option<Uuid>,
        limit: u64,
    ) -> Result<Vec<SyncLog>, RepositoryError> {
        let mut query = sync_log_entity::Entity::find();

        if let Some(platform_id) = platform_id {
            query = query.filter(sync_log_entity::Column::PlatformId.eq(platform_id));
        }

        let models = query
            .order_by_desc(sync_log_entity::Column::StartedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(SyncLog::from).collect())
    }
}
