// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::webhook_event_repository::RepositoryError;
use crate::domain::models::canonical::{CanonicalSubscription, SubscriptionStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 已落库的订阅记录
#[derive(Debug, Clone)]
pub struct SubscriptionRecord {
    /// 内部订阅ID
    pub id: Uuid,
    /// 平台侧订阅ID
    pub external_id: String,
    /// 所属客户内部ID
    pub customer_id: Uuid,
    /// 订阅状态
    pub status: SubscriptionStatus,
    /// 是否处于试用期
    pub trial_active: bool,
    /// 周期金额（最小货币单位）
    pub amount: i64,
    /// 当前周期结束时间
    pub current_period_end: Option<DateTime<Utc>>,
}

/// 订阅仓库特质
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// 根据平台与外部ID查找订阅
    async fn find_by_external(
        &self,
        platform_id: Uuid,
        external_id: &str,
    ) -> Result<Option<SubscriptionRecord>, RepositoryError>;
    /// 幂等upsert，键为 (platform_id, external_id)
    async fn upsert(
        &self,
        platform_id: Uuid,
        customer_id: Uuid,
        product_id: Option<Uuid>,
        subscription: &CanonicalSubscription,
    ) -> Result<SubscriptionRecord, RepositoryError>;
    /// 字段级漂移修正（对账路径）
    async fn update_drift(
        &self,
        id: Uuid,
        status: SubscriptionStatus,
        amount: i64,
        current_period_end: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError>;
}
