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

use crate::domain::models::canonical::{CanonicalTransaction, TransactionStatus};
use crate::domain::repositories::transaction_repository::{
    TransactionRecord, TransactionRepository,
};
use crate::domain::repositories::webhook_event_repository::RepositoryError;
use crate::infrastructure::database::entities::transaction as transaction_entity;
use crate::infrastructure::database::entities::transaction_allocation as allocation_entity;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 交易仓库实现
///
/// 交易只插入不覆盖，(platform_id, external_id) 唯一索引兜底
/// 并发重复。订阅分摊走独立的transaction_allocations关联表。
#[derive(Clone)]
pub struct TransactionRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl TransactionRepositoryImpl {
    /// 创建新的交易仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<transaction_entity::Model> for TransactionRecord {
    fn from(model: transaction_entity::Model) -> Self {
        Self {
            id: model.id,
            external_id: model.external_id,
            customer_id: model.customer_id,
            status: model.status.parse().unwrap_or(TransactionStatus::Pending),
            amount: model.amount,
        }
    }
}

#[async_trait]
impl TransactionRepository for TransactionRepositoryImpl {
    async fn find_by_external(
        &self,
        platform_id: Uuid,
        external_id: &str,
    ) -> Result<Option<TransactionRecord>, RepositoryError> {
        let model = transaction_entity::Entity::find()
            .filter(transaction_entity::Column::PlatformId.eq(platform_id))
            .filter(transaction_entity::Column::ExternalId.eq(external_id))
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn insert(
        &self,
        platform_id: Uuid,
        customer_id: Uuid,
        order_id: Option<Uuid>,
        transaction: &CanonicalTransaction,
    ) -> Result<TransactionRecord, RepositoryError> {
        let active = transaction_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            platform_id: Set(platform_id),
            customer_id: Set(customer_id),
            order_id: Set(order_id),
            external_id: Set(transaction.external_id.clone()),
            external_customer_id: Set(transaction.external_customer_id.clone()),
            external_subscription_id: Set(transaction.external_subscription_id.clone()),
            external_invoice_id: Set(transaction.external_invoice_id.clone()),
            txn_type: Set(transaction.txn_type.as_str().to_string()),
            status: Set(transaction.status.as_str().to_string()),
            amount: Set(transaction.amount),
            currency: Set(transaction.currency.clone()),
            payment_method: Set(transaction.payment_method.as_str().to_string()),
            external_created_at: Set(transaction.created_at.map(Into::into)),
            paid_at: Set(transaction.paid_at.map(Into::into)),
            refunded_at: Set(transaction.refunded_at.map(Into::into)),
            created_at: Set(Utc::now().into()),
        };

        let inserted = active.insert(self.db.as_ref()).await?;
        Ok(inserted.into())
    }

    async fn link_subscription(
        &self,
        transaction_id: Uuid,
        subscription_id: Uuid,
    ) -> Result<(), RepositoryError> {
        let active = allocation_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            transaction_id: Set(transaction_id),
            subscription_id: Set(subscription_id),
            created_at: Set(Utc::now().into()),
        };

        active.insert(self.db.as_ref()).await?;
        Ok(())
    }

    async fn update_drift(
        &self,
        id: Uuid,
        status: TransactionStatus,
        amount: i64,
    ) -> Result<(), RepositoryError> {
        let model = transaction_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let mut active: transaction_entity::ActiveModel = model.into();
        active.status = Set(status.as_str().to_string());
        active.amount = Set(amount);
        active.update(self.db.as_ref()).await?;

        Ok(())
    }
}
