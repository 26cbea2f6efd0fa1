// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::{Platform, PlatformCredential};
use crate::domain::repositories::platform_repository::PlatformRepository;
use crate::domain::repositories::webhook_event_repository::RepositoryError;
use crate::infrastructure::database::entities::platform as platform_entity;
use crate::infrastructure::database::entities::platform_credential as credential_entity;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// 平台仓库实现
///
/// 平台表很小且只读，不做缓存。凭证类型字段存储为字符串，
/// 数据库中出现未知类型时跳过该行并告警，而不是让整个平台失效。
#[derive(Clone)]
pub struct PlatformRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl PlatformRepositoryImpl {
    /// 创建新的平台仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<platform_entity::Model> for Platform {
    fn from(model: platform_entity::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            enabled: model.enabled,
            webhook_only: model.webhook_only,
            base_currency: model.base_currency,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[async_trait]
impl PlatformRepository for PlatformRepositoryImpl {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Platform>, RepositoryError> {
        let model = platform_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Platform>, RepositoryError> {
        let model = platform_entity::Entity::find()
            .filter(platform_entity::Column::Slug.eq(slug))
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn list_enabled(&self) -> Result<Vec<Platform>, RepositoryError> {
        let models = platform_entity::Entity::find()
            .filter(platform_entity::Column::Enabled.eq(true))
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(Platform::from).collect())
    }

    async fn list_credentials(
        &self,
        platform_id: Uuid,
    ) -> Result<Vec<PlatformCredential>, RepositoryError> {
        let models = credential_entity::Entity::find()
            .filter(credential_entity::Column::PlatformId.eq(platform_id))
            .all(self.db.as_ref())
            .await?;

        let credentials = models
            .into_iter()
            .filter_map(|model| match model.credential_type.parse() {
                Ok(credential_type) => Some(PlatformCredential {
                    id: model.id,
                    platform_id: model.platform_id,
                    credential_type,
                    secret: model.secret,
                }),
                Err(()) => {
                    warn!(
                        platform_id = %model.platform_id,
                        credential_type = %model.credential_type,
                        "Skipping credential with unknown type"
                    );
                    None
                }
            })
            .collect();

        Ok(credentials)
    }
}
