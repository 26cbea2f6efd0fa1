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

use crate::domain::models::canonical::{CanonicalSubscription, SubscriptionStatus};
use crate::domain::repositories::subscription_repository::{
    SubscriptionRecord, SubscriptionRepository,
};
use crate::domain::repositories::webhook_event_repository::RepositoryError;
use crate::infrastructure::database::entities::subscription as subscription_entity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 订阅仓库实现
///
/// upsert以 (platform_id, external_id) 为键整行覆盖；对账路径
/// 用update_drift只修正少数漂移字段，避免覆盖webhook写入的数据。
#[derive(Clone)]
pub struct SubscriptionRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl SubscriptionRepositoryImpl {
    /// 创建新的订阅仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<subscription_entity::Model> for SubscriptionRecord {
    fn from(model: subscription_entity::Model) -> Self {
        let status = model
            .status
            .parse()
            .unwrap_or(SubscriptionStatus::Canceled);
        Self {
            id: model.id,
            external_id: model.external_id,
            customer_id: model.customer_id,
            status,
            trial_active: status == SubscriptionStatus::TrialActive,
            amount: model.amount,
            current_period_end: model.current_period_end.map(|t| t.with_timezone(&Utc)),
        }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionRepositoryImpl {
    async fn find_by_external(
        &self,
        platform_id: Uuid,
        external_id: &str,
    ) -> Result<Option<SubscriptionRecord>, RepositoryError> {
        let model = subscription_entity::Entity::find()
            .filter(subscription_entity::Column::PlatformId.eq(platform_id))
            .filter(subscription_entity::Column::ExternalId.eq(external_id))
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn upsert(
        &self,
        platform_id: Uuid,
        customer_id: Uuid,
        product_id: Option<Uuid>,
        subscription: &CanonicalSubscription,
    ) -> Result<SubscriptionRecord, RepositoryError> {
        let existing = subscription_entity::Entity::find()
            .filter(subscription_entity::Column::PlatformId.eq(platform_id))
            .filter(subscription_entity::Column::ExternalId.eq(subscription.external_id.as_str()))
            .one(self.db.as_ref())
            .await?;

        if let Some(model) = existing {
            let mut active: subscription_entity::ActiveModel = model.into();
            active.customer_id = Set(customer_id);
            active.product_id = Set(product_id);
            active.external_customer_id = Set(subscription.external_customer_id.clone());
            active.external_product_id = Set(subscription.external_product_id.clone());
            active.external_price_id = Set(subscription.external_price_id.clone());
            active.status = Set(subscription.status.to_string());
            active.trial_start = Set(subscription.trial_start.map(Into::into));
            active.trial_end = Set(subscription.trial_end.map(Into::into));
            active.amount = Set(subscription.amount);
            active.currency = Set(subscription.currency.clone());
            active.billing_period = Set(subscription.billing_period.as_str().to_string());
            active.billing_interval = Set(subscription.billing_interval);
            active.started_at = Set(subscription.started_at.map(Into::into));
            active.current_period_start = Set(subscription.current_period_start.map(Into::into));
            active.current_period_end = Set(subscription.current_period_end.map(Into::into));
            active.next_billing_at = Set(subscription.next_billing_at.map(Into::into));
            active.canceled_at = Set(subscription.canceled_at.map(Into::into));
            active.metadata = Set(subscription.metadata.clone());
            active.updated_at = Set(Utc::now().into());

            let updated = active.update(self.db.as_ref()).await?;
            return Ok(updated.into());
        }

        let now = Utc::now();
        let active = subscription_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            platform_id: Set(platform_id),
            customer_id: Set(customer_id),
            product_id: Set(product_id),
            external_id: Set(subscription.external_id.clone()),
            external_customer_id: Set(subscription.external_customer_id.clone()),
            external_product_id: Set(subscription.external_product_id.clone()),
            external_price_id: Set(subscription.external_price_id.clone()),
            status: Set(subscription.status.to_string()),
            trial_start: Set(subscription.trial_start.map(Into::into)),
            trial_end: Set(subscription.trial_end.map(Into::into)),
            amount: Set(subscription.amount),
            currency: Set(subscription.currency.clone()),
            billing_period: Set(subscription.billing_period.as_str().to_string()),
            billing_interval: Set(subscription.billing_interval),
            started_at: Set(subscription.started_at.map(Into::into)),
            current_period_start: Set(subscription.current_period_start.map(Into::into)),
            current_period_end: Set(subscription.current_period_end.map(Into::into)),
            next_billing_at: Set(subscription.next_billing_at.map(Into::into)),
            canceled_at: Set(subscription.canceled_at.map(Into::into)),
            metadata: Set(subscription.metadata.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let inserted = active.insert(self.db.as_ref()).await?;
        Ok(inserted.into())
    }

    async fn update_drift(
        &self,
        id: Uuid,
        status: SubscriptionStatus,
        amount: i64,
        current_period_end: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let model = subscription_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let mut active: subscription_entity::ActiveModel = model.into();
        active.status = Set(status.to_string());
        active.amount = Set(amount);
        active.current_period_end = Set(current_period_end.map(Into::into));
        active.updated_at = Set(Utc::now().into());
        active.update(self.db.as_ref()).await?;

        Ok(())
    }
}
