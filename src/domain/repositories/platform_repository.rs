// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::webhook_event_repository::RepositoryError;
use crate::domain::models::platform::{Platform, PlatformCredential};
use async_trait::async_trait;
use uuid::Uuid;

/// 平台仓库特质
///
/// 定义支付平台及其凭证的数据访问接口。凭证在此边界上
/// 已经是解密后的明文（加解密属于外部协作方）。
#[async_trait]
pub trait PlatformRepository: Send + Sync {
    /// 根据ID查找平台
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Platform>, RepositoryError>;
    /// 根据slug查找平台
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Platform>, RepositoryError>;
    /// 列出所有启用的平台
    async fn list_enabled(&self) -> Result<Vec<Platform>, RepositoryError>;
    /// 获取平台的全部凭证
    async fn list_credentials(
        &self,
        platform_id: Uuid,
    ) -> Result<Vec<PlatformCredential>, RepositoryError>;
}
