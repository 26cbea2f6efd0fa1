// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::webhook_event_repository::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 产品仓库特质
///
/// 产品记录由订阅持久化按需懒创建，只需要解析出内部ID。
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// 查找或创建产品，返回内部产品ID
    async fn find_or_create(
        &self,
        platform_id: Uuid,
        external_id: &str,
        name: &str,
    ) -> Result<Uuid, RepositoryError>;
}
