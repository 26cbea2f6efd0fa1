// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::affiliate::AffiliateTier;
use crate::domain::models::canonical::CanonicalAffiliate;
use crate::domain::repositories::affiliate_repository::{AffiliateRecord, AffiliateRepository};
use crate::domain::repositories::webhook_event_repository::RepositoryError;
use crate::infrastructure::database::entities::affiliate as affiliate_entity;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 联盟伙伴仓库实现
///
/// upsert只维护画像字段，业绩计数与等级由持久化例程在收入侧
/// 副作用阶段通过update_performance写入。
#[derive(Clone)]
pub struct AffiliateRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl AffiliateRepositoryImpl {
    /// 创建新的联盟伙伴仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<affiliate_entity::Model> for AffiliateRecord {
    fn from(model: affiliate_entity::Model) -> Self {
        Self {
            id: model.id,
            external_id: model.external_id,
            total_sales: model.total_sales,
            total_revenue: model.total_revenue,
            tier: model.tier.parse().unwrap_or(AffiliateTier::Bronze),
        }
    }
}

#[async_trait]
impl AffiliateRepository for AffiliateRepositoryImpl {
    async fn upsert(
        &self,
        platform_id: Uuid,
        affiliate: &CanonicalAffiliate,
    ) -> Result<AffiliateRecord, RepositoryError> {
        let existing = affiliate_entity::Entity::find()
            .filter(affiliate_entity::Column::PlatformId.eq(platform_id))
            .filter(affiliate_entity::Column::ExternalId.eq(affiliate.external_id.as_str()))
            .one(self.db.as_ref())
            .await?;

        if let Some(model) = existing {
            let mut active: affiliate_entity::ActiveModel = model.into();
            active.name = Set(affiliate.name.clone());
            active.email = Set(affiliate.email.clone());
            active.updated_at = Set(Utc::now().into());

            let updated = active.update(self.db.as_ref()).await?;
            return Ok(updated.into());
        }

        let now = Utc::now();
        let active = affiliate_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            platform_id: Set(platform_id),
            external_id: Set(affiliate.external_id.clone()),
            name: Set(affiliate.name.clone()),
            email: Set(affiliate.email.clone()),
            total_sales: Set(0),
            total_revenue: Set(0),
            tier: Set(AffiliateTier::Bronze.to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let inserted = active.insert(self.db.as_ref()).await?;
        Ok(inserted.into())
    }

    async fn update_performance(
        &self,
        id: Uuid,
        total_sales: i64,
        total_revenue: i64,
        tier: AffiliateTier,
    ) -> Result<(), RepositoryError> {
        let model = affiliate_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let mut active: affiliate_entity::ActiveModel = model.into();
        active.total_sales = Set(total_sales);
        active.total_revenue = Set(total_revenue);
        active.tier = Set(tier.to_string());
        active.updated_at = Set(Utc::now().into());
        active.update(self.db.as_ref()).await?;

        Ok(())
    }
}
