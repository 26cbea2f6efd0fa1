// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::webhook_event_repository::RepositoryError;
use crate::domain::models::canonical::CanonicalOrder;
use async_trait::async_trait;
use uuid::Uuid;

/// 订单仓库特质
///
/// 订单只在片段携带订单数据且尚无既有订单时创建。
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 根据平台与外部ID查找订单，返回内部订单ID
    async fn find_by_external(
        &self,
        platform_id: Uuid,
        external_id: &str,
    ) -> Result<Option<Uuid>, RepositoryError>;
    /// 创建订单，返回内部订单ID
    async fn create(
        &self,
        platform_id: Uuid,
        customer_id: Option<Uuid>,
        order: &CanonicalOrder,
    ) -> Result<Uuid, RepositoryError>;
}
