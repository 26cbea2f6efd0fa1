// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::product_repository::ProductRepository;
use crate::domain::repositories::webhook_event_repository::RepositoryError;
use crate::infrastructure::database::entities::product as product_entity;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 产品仓库实现
#[derive(Clone)]
pub struct ProductRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl ProductRepositoryImpl {
    /// 创建新的产品仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductRepository for ProductRepositoryImpl {
    async fn find_or_create(
        &self,
        platform_id: Uuid,
        external_id: &str,
        name: &str,
    ) -> Result<Uuid, RepositoryError> {
        let existing = product_entity::Entity::find()
            .filter(product_entity::Column::PlatformId.eq(platform_id))
            .filter(product_entity::Column::ExternalId.eq(external_id))
            .one(self.db.as_ref())
            .await?;

        if let Some(model) = existing {
            return Ok(model.id);
        }

        let active = product_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            platform_id: Set(platform_id),
            external_id: Set(external_id.to_string()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now().into()),
        };

        let inserted = active.insert(self.db.as_ref()).await?;
        Ok(inserted.id)
    }
}
