// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! Webhook事件处理器模块
//!
//! 每个处理器负责把单一平台、单一事件类型的原生载荷翻译为
//! 规范化片段。翻译与持久化分离：处理器不触库，
//! 持久化由事件工作器调用规范化持久化例程完成。

pub mod hotmart;
pub mod kiwify;
pub mod registry;
pub mod stripe;
pub mod synthetic;

use crate::domain::models::canonical::CanonicalFragment;
use thiserror::Error;

/// 处理器错误类型
#[derive(Debug, Error)]
pub enum HandlerError {
    /// 没有处理器接入该(平台, 事件类型)组合
    #[error("no handler registered for ({slug}, {event_type})")]
    UnmappedEvent { slug: String, event_type: String },
    /// 载荷缺失字段或结构不符
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl HandlerError {
    /// 未接入的事件组合是终态错误，事件直接置为失败，不重试
    pub fn is_fatal(&self) -> bool {
        matches!(self, HandlerError::UnmappedEvent { .. })
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        HandlerError::MalformedPayload(e.to_string())
    }
}

/// 事件处理器trait
///
/// 输入原生Webhook载荷，输出规范化片段。实现必须是纯翻译，
/// 同一载荷多次调用产出相同片段。
pub trait EventHandler: Send + Sync {
    /// 翻译载荷
    fn translate(&self, payload: &serde_json::Value) -> Result<CanonicalFragment, HandlerError>;
}
