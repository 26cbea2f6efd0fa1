// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 适配器接口定义
pub mod adapter;
/// Hotmart平台适配器
pub mod hotmart;
/// Kiwify平台适配器
pub mod kiwify;
/// 平台解析器
pub mod resolver;
/// Stripe平台适配器
pub mod stripe;
