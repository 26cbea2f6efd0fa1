// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 指标重算信号
pub mod metrics_notifier;
/// 规范化持久化例程
pub mod persistence_service;
