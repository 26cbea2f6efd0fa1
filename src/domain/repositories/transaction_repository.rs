// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::webhook_event_repository::RepositoryError;
use crate::domain::models::canonical::{CanonicalTransaction, TransactionStatus};
use async_trait::async_trait;
use uuid::Uuid;

/// 已落库的交易记录
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    /// 内部交易ID
    pub id: Uuid,
    /// 平台侧交易ID
    pub external_id: String,
    /// 所属客户内部ID
    pub customer_id: Uuid,
    /// 交易状态
    pub status: TransactionStatus,
    /// 金额（最小货币单位）
    pub amount: i64,
}

/// 交易仓库特质
///
/// 交易是插入而非upsert：每次投递代表一笔新的资金事件。
/// (platform_id, external_id) 上的唯一索引负责压制重复投递。
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// 根据平台与外部ID查找交易
    async fn find_by_external(
        &self,
        platform_id: Uuid,
        external_id: &str,
    ) -> Result<Option<TransactionRecord>, RepositoryError>;
    /// 插入一笔交易
    async fn insert(
        &self,
        platform_id: Uuid,
        customer_id: Uuid,
        order_id: Option<Uuid>,
        transaction: &CanonicalTransaction,
    ) -> Result<TransactionRecord, RepositoryError>;
    /// 建立交易与订阅的分摊关联
    async fn link_subscription(
        &self,
        transaction_id: Uuid,
        subscription_id: Uuid,
    ) -> Result<(), RepositoryError>;
    /// 字段级漂移修正（对账路径）
    async fn update_drift(
        &self,
        id: Uuid,
        status: TransactionStatus,
        amount: i64,
    ) -> Result<(), RepositoryError>;
}
