// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 对账合成事件使用的签名占位值
pub const SYNTHETIC_SIGNATURE: &str = "N/A (from sync)";

/// Webhook事件实体
///
/// 表示一次入站（或由对账合成的）事件投递，包含原始负载、
/// 处理状态和重试机制等信息。事件一经创建永不删除，
/// 状态与重试计数只由事件处理器推进。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// 事件唯一标识符
    pub id: Uuid,
    /// 所属平台ID
    pub platform_id: Uuid,
    /// 平台侧事件ID，与平台ID一起构成去重键
    pub external_event_id: String,
    /// 事件类型，决定分发到哪个处理器
    pub event_type: String,
    /// 原始事件负载（平台原生结构，或合成事件的规范化结构）
    pub payload: serde_json::Value,
    /// 签名令牌，合成事件为 "N/A (from sync)"
    pub signature: String,
    /// 事件状态
    pub status: WebhookEventStatus,
    /// 已重试次数
    pub retry_count: i32,
    /// 最大重试次数
    pub max_retries: i32,
    /// 最近一次失败的错误信息
    pub error_message: Option<String>,
    /// 下次重试时间，由退避策略写入
    pub next_retry_at: Option<DateTime<Utc>>,
    /// 接收时间
    pub received_at: DateTime<Utc>,
    /// 处理完成时间
    pub processed_at: Option<DateTime<Utc>>,
}

impl WebhookEvent {
    /// 创建一个新的待处理事件
    ///
    /// # 参数
    ///
    /// * `platform_id` - 所属平台ID
    /// * `external_event_id` - 平台侧事件ID
    /// * `event_type` - 事件类型
    /// * `payload` - 原始负载
    /// * `signature` - 签名令牌
    pub fn new(
        platform_id: Uuid,
        external_event_id: String,
        event_type: String,
        payload: serde_json::Value,
        signature: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            platform_id,
            external_event_id,
            event_type,
            payload,
            signature,
            status: WebhookEventStatus::Pending,
            retry_count: 0,
            max_retries: 5,
            error_message: None,
            next_retry_at: None,
            received_at: Utc::now(),
            processed_at: None,
        }
    }

    /// 创建一条对账合成事件
    ///
    /// 合成事件使用生成的唯一外部ID，因此不会与真实投递碰撞；
    /// 同一业务记录可能被再次处理，幂等性由持久化例程保证。
    pub fn synthetic(platform_id: Uuid, event_type: String, payload: serde_json::Value) -> Self {
        Self::new(
            platform_id,
            format!("sync-{}", Uuid::new_v4()),
            event_type,
            payload,
            SYNTHETIC_SIGNATURE.to_string(),
        )
    }

    /// 事件是否来自对账合成
    pub fn is_synthetic(&self) -> bool {
        self.signature == SYNTHETIC_SIGNATURE
    }
}

/// Webhook事件状态枚举
///
/// pending → processing → {processed | pending(重试) | failed(终态)}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventStatus {
    /// 待处理，事件已入库但尚未被工作器认领
    #[default]
    Pending,
    /// 处理中，已被某个工作器认领
    Processing,
    /// 已处理，持久化成功的终态
    Processed,
    /// 失败终态，重试次数已耗尽，不再自动复活
    Failed,
}

impl fmt::Display for WebhookEventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebhookEventStatus::Pending => write!(f, "pending"),
            WebhookEventStatus::Processing => write!(f, "processing"),
            WebhookEventStatus::Processed => write!(f, "processed"),
            WebhookEventStatus::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_event_marker() {
        let event = WebhookEvent::synthetic(
            Uuid::new_v4(),
            "subscription.created".to_string(),
            serde_json::json!({}),
        );
        assert!(event.is_synthetic());
        assert!(event.external_event_id.starts_with("sync-"));
        assert_eq!(event.status, WebhookEventStatus::Pending);
        assert_eq!(event.retry_count, 0);
    }

    #[test]
    fn test_new_event_defaults() {
        let event = WebhookEvent::new(
            Uuid::new_v4(),
            "evt_123".to_string(),
            "invoice.payment_succeeded".to_string(),
            serde_json::json!({"id": "evt_123"}),
            "t=1,v1=abc".to_string(),
        );
        assert!(!event.is_synthetic());
        assert_eq!(event.max_retries, 5);
        assert!(event.processed_at.is_none());
    }
}
