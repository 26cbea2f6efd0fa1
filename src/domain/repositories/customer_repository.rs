// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::webhook_event_repository::RepositoryError;
use crate::domain::models::canonical::CanonicalCustomer;
use async_trait::async_trait;
use uuid::Uuid;

/// 已落库的客户记录
///
/// 持久化例程与对账调度器需要的最小读侧投影。
#[derive(Debug, Clone)]
pub struct CustomerRecord {
    /// 内部客户ID
    pub id: Uuid,
    /// 平台侧客户ID
    pub external_id: String,
    /// 姓名
    pub name: Option<String>,
    /// 邮箱
    pub email: Option<String>,
    /// 终身消费总额（最小货币单位）
    pub lifetime_spend: i64,
}

/// 客户仓库特质
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// 根据平台与外部ID查找客户
    async fn find_by_external(
        &self,
        platform_id: Uuid,
        external_id: &str,
    ) -> Result<Option<CustomerRecord>, RepositoryError>;
    /// 幂等upsert，键为 (platform_id, external_id)
    async fn upsert(
        &self,
        platform_id: Uuid,
        customer: &CanonicalCustomer,
    ) -> Result<CustomerRecord, RepositoryError>;
    /// 累加客户终身消费
    async fn increment_lifetime_spend(&self, id: Uuid, amount: i64)
        -> Result<(), RepositoryError>;
    /// 字段级漂移修正（对账路径，不做整行upsert）
    async fn update_contact(
        &self,
        id: Uuid,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<(), RepositoryError>;
}
