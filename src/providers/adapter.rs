// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::canonical::{
    CanonicalCustomer, CanonicalSubscription, CanonicalTransaction,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// 适配器错误类型
///
/// 网络与HTTP失败原样向调用方传播，适配器内部不做静默重试，
/// 重试是事件处理器和对账调度器的职责。
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Platform API error: status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
    #[error("Invalid platform response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// 缺失凭证等未配置错误属于致命错误，不应重试
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProviderError::NotConfigured(_))
    }
}

/// 拉取参数
#[derive(Debug, Clone, Default)]
pub struct FetchParams {
    /// 时间窗口起点
    pub start_date: Option<DateTime<Utc>>,
    /// 时间窗口终点
    pub end_date: Option<DateTime<Utc>>,
    /// 单页条数
    pub limit: Option<u32>,
    /// 平台原生游标
    pub cursor: Option<String>,
}

impl FetchParams {
    /// 对账调度器使用的标准窗口：最近24小时，页宽1000
    pub fn last_day(limit: u32) -> Self {
        let now = Utc::now();
        Self {
            start_date: Some(now - chrono::Duration::hours(24)),
            end_date: Some(now),
            limit: Some(limit),
            cursor: None,
        }
    }

    /// 以新的游标继续同一窗口
    pub fn with_cursor(&self, cursor: Option<String>) -> Self {
        Self {
            cursor,
            ..self.clone()
        }
    }
}

/// 单页拉取结果
#[derive(Debug, Clone)]
pub struct FetchPage<T> {
    /// 本页规范化记录
    pub records: Vec<T>,
    /// 下一页游标，None表示已到末尾
    pub next_cursor: Option<String>,
}

impl<T> FetchPage<T> {
    /// 空页（例如平台不提供对应API时）
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            next_cursor: None,
        }
    }
}

/// 平台适配器特质
///
/// 每个支付平台一个实现，把平台原生对象翻译为规范模型。
/// 所有金额在这里完成最小货币单位换算；未知的平台词汇
/// 映射到最保守的规范值而不是报错，对账必须在厂商词汇
/// 不完整时也能推进。
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// 拉取订阅
    async fn fetch_subscriptions(
        &self,
        params: &FetchParams,
    ) -> Result<FetchPage<CanonicalSubscription>, ProviderError>;

    /// 拉取交易
    async fn fetch_transactions(
        &self,
        params: &FetchParams,
    ) -> Result<FetchPage<CanonicalTransaction>, ProviderError>;

    /// 拉取客户（无客户API的平台返回空页，调用方视为有效结果）
    async fn fetch_customers(
        &self,
        params: &FetchParams,
    ) -> Result<FetchPage<CanonicalCustomer>, ProviderError>;

    /// 连通性测试，吞掉错误只返回布尔
    async fn test_connection(&self) -> bool;

    /// 适配器对应的平台slug
    fn slug(&self) -> &'static str;
}
