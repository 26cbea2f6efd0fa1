// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 联盟伙伴模型
pub mod affiliate;
/// 规范化支付模型
pub mod canonical;
/// 支付平台模型
pub mod platform;
/// 对账日志模型
pub mod sync_log;
/// Webhook事件模型
pub mod webhook_event;
