// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::webhook_event::WebhookEvent;
use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
}

/// Webhook事件仓库特质
///
/// 定义事件存储的数据访问接口。事件行同时充当工作队列的
/// 持久化载体：到期的pending事件被工作器批量取出处理。
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// 创建Webhook事件
    async fn create(&self, event: &WebhookEvent) -> Result<WebhookEvent, RepositoryError>;
    /// 根据ID查找Webhook事件
    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookEvent>, RepositoryError>;
    /// 根据平台与外部事件ID查找（投递去重）
    async fn find_by_external(
        &self,
        platform_id: Uuid,
        external_event_id: &str,
    ) -> Result<Option<WebhookEvent>, RepositoryError>;
    /// 查找到期待处理的事件（pending且next_retry_at为空或已到期）
    async fn find_due(&self, limit: u64) -> Result<Vec<WebhookEvent>, RepositoryError>;
    /// 更新Webhook事件
    async fn update(&self, event: &WebhookEvent) -> Result<WebhookEvent, RepositoryError>;
}
