// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 金额规整模块
pub mod money;
/// 重试策略模块
pub mod retry_policy;
/// 遥测模块
pub mod telemetry;
