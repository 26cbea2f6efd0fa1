// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 合成事件处理器
//!
//! 对账调度器发现缺失记录时注入的合成事件，其载荷已经是
//! 规范化片段，所有事件类型（subscription.created、
//! transaction.created、customer.created）共用同一个处理器，
//! 只做反序列化，不做平台相关翻译。事件工作器按合成签名标记
//! 选择本处理器，不经过注册表。

use crate::domain::models::canonical::CanonicalFragment;
use crate::handlers::{EventHandler, HandlerError};
use serde_json::Value;

pub struct SyntheticHandler;

impl EventHandler for SyntheticHandler {
    fn translate(&self, payload: &Value) -> Result<CanonicalFragment, HandlerError> {
        Ok(serde_json::from_value(payload.clone())?)
    }
}
