// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::webhook_event_repository::RepositoryError;
use crate::domain::models::affiliate::AffiliateTier;
use crate::domain::models::canonical::CanonicalAffiliate;
use async_trait::async_trait;
use uuid::Uuid;

/// 已落库的联盟伙伴记录
#[derive(Debug, Clone)]
pub struct AffiliateRecord {
    /// 内部联盟伙伴ID
    pub id: Uuid,
    /// 平台侧联盟伙伴ID
    pub external_id: String,
    /// 累计成交笔数
    pub total_sales: i64,
    /// 累计归因收入（最小货币单位）
    pub total_revenue: i64,
    /// 当前等级
    pub tier: AffiliateTier,
}

/// 联盟伙伴仓库特质
#[async_trait]
pub trait AffiliateRepository: Send + Sync {
    /// 幂等upsert，键为 (platform_id, external_id)
    async fn upsert(
        &self,
        platform_id: Uuid,
        affiliate: &CanonicalAffiliate,
    ) -> Result<AffiliateRecord, RepositoryError>;
    /// 更新业绩计数与等级
    async fn update_performance(
        &self,
        id: Uuid,
        total_sales: i64,
        total_revenue: i64,
        tier: AffiliateTier,
    ) -> Result<(), RepositoryError>;
}
