// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::webhook_event_repository::RepositoryError;
use crate::domain::models::sync_log::SyncLog;
use async_trait::async_trait;
use uuid::Uuid;

/// 对账日志仓库特质
#[async_trait]
pub trait SyncLogRepository: Send + Sync {
    /// 创建对账日志（status=running）
    async fn create(&self, log: &SyncLog) -> Result<SyncLog, RepositoryError>;
    /// 更新对账日志（收尾时恰好调用一次）
    async fn update(&self, log: &SyncLog) -> Result<SyncLog, RepositoryError>;
    /// 读取最近的对账日志，可按平台过滤
    async fn list_recent(
        &self,
        platform_id: Option<Uuid>,
        limit: u64,
    ) -> Result<Vec<SyncLog>, RepositoryError>;
}
