// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::canonical::CanonicalOrder;
use crate::domain::repositories::order_repository::OrderRepository;
use crate::domain::repositories::webhook_event_repository::RepositoryError;
use crate::infrastructure::database::entities::order as order_entity;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 订单仓库实现
#[derive(Clone)]
pub struct OrderRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl OrderRepositoryImpl {
    /// 创建新的订单仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderRepository for OrderRepositoryImpl {
    async fn find_by_external(
        &self,
        platform_id: Uuid,
        external_id: &str,
    ) -> Result<Option<Uuid>, RepositoryError> {
        let model = order_entity::Entity::find()
            .filter(order_entity::Column::PlatformId.eq(platform_id))
            .filter(order_entity::Column::ExternalId.eq(external_id))
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(|m| m.id))
    }

    async fn create(
        &self,
        platform_id: Uuid,
        customer_id: Option<Uuid>,
        order: &CanonicalOrder,
    ) -> Result<Uuid, RepositoryError> {
        let active = order_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            platform_id: Set(platform_id),
            customer_id: Set(customer_id),
            external_id: Set(order.external_id.clone()),
            total_amount: Set(order.total_amount),
            currency: Set(order.currency.clone()),
            status: Set(order.status.clone()),
            created_at: Set(Utc::now().into()),
        };

        let inserted = active.insert(self.db.as_ref()).await?;
        Ok(inserted.id)
    }
}
