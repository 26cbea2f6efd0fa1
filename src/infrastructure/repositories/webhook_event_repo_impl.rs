// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::webhook_event::{WebhookEvent, WebhookEventStatus};
use crate::domain::repositories::webhook_event_repository::{
    RepositoryError, WebhookEventRepository,
};
use crate::infrastructure::database::entities::webhook_event::{
    self as event_entity, SeaEventStatus,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// Webhook事件仓库实现
///
/// 基于SeaORM实现的事件数据访问层。事件行同时是工作队列的
/// 持久化载体，find_due按received_at排序保证老事件优先。
#[derive(Clone)]
pub struct WebhookEventRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl WebhookEventRepositoryImpl {
    /// 创建新的事件仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<WebhookEventStatus> for SeaEventStatus {
    fn from(status: WebhookEventStatus) -> Self {
        match status {
            WebhookEventStatus::Pending => SeaEventStatus::Pending,
            WebhookEventStatus::Processing => SeaEventStatus::Processing,
            WebhookEventStatus::Processed => SeaEventStatus::Processed,
            WebhookEventStatus::Failed => SeaEventStatus::Failed,
        }
    }
}

impl From<SeaEventStatus> for WebhookEventStatus {
    fn from(status: SeaEventStatus) -> Self {
        match status {
            SeaEventStatus::Pending => WebhookEventStatus::Pending,
            SeaEventStatus::Processing => WebhookEventStatus::Processing,
            SeaEventStatus::Processed => WebhookEventStatus::Processed,
            SeaEventStatus::Failed => WebhookEventStatus::Failed,
        }
    }
}

impl From<event_entity::Model> for WebhookEvent {
    fn from(model: event_entity::Model) -> Self {
        Self {
            id: model.id,
            platform_id: model.platform_id,
            external_event_id: model.external_event_id,
            event_type: model.event_type,
            payload: model.payload,
            signature: model.signature,
            status: model.status.into(),
            retry_count: model.retry_count,
            max_retries: model.max_retries,
            error_message: model.error_message,
            next_retry_at: model.next_retry_at.map(|t| t.with_timezone(&Utc)),
            received_at: model.received_at.with_timezone(&Utc),
            processed_at: model.processed_at.map(|t| t.with_timezone(&Utc)),
        }
    }
}

impl From<WebhookEvent> for event_entity::ActiveModel {
    fn from(event: WebhookEvent) -> Self {
        Self {
            id: Set(event.id),
            platform_id: Set(event.platform_id),
            external_event_id: Set(event.external_event_id),
            event_type: Set(event.event_type),
            payload: Set(event.payload),
            signature: Set(event.signature),
            status: Set(event.status.into()),
            retry_count: Set(event.retry_count),
            max_retries: Set(event.max_retries),
            error_message: Set(event.error_message),
            next_retry_at: Set(event.next_retry_at.map(Into::into)),
            received_at: Set(event.received_at.into()),
            processed_at: Set(event.processed_at.map(Into::into)),
        }
    }
}

#[async_trait]
impl WebhookEventRepository for WebhookEventRepositoryImpl {
    async fn create(&self, event: &WebhookEvent) -> Result<WebhookEvent, RepositoryError> {
        let model: event_entity::ActiveModel = event.clone().into();

        model.insert(self.db.as_ref()).await?;
        Ok(event.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookEvent>, RepositoryError> {
        let model = event_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn find_by_external(
        &self,
        platform_id: Uuid,
        external_event_id: &str,
    ) -> Result<Option<WebhookEvent>, RepositoryError> {
        let model = event_entity::Entity::find()
            .filter(event_entity::Column::PlatformId.eq(platform_id))
            .filter(event_entity::Column::ExternalEventId.eq(external_event_id))
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn find_due(&self, limit: u64) -> Result<Vec<WebhookEvent>, RepositoryError> {
        let models = event_entity::Entity::find()
            .filter(event_entity::Column::Status.eq(SeaEventStatus::Pending))
            .filter(
                Condition::any()
                    .add(event_entity::Column::NextRetryAt.is_null())
                    .add(event_entity::Column::NextRetryAt.lte(Utc::now())),
            )
            .order_by_asc(event_entity::Column::ReceivedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(WebhookEvent::from).collect())
    }

    async fn update(&self, event: &WebhookEvent) -> Result<WebhookEvent, RepositoryError> {
        let model: event_entity::ActiveModel = event.clone().into();

        let updated = model.update(self.db.as_ref()).await?;
        Ok(updated.into())
    }
}
