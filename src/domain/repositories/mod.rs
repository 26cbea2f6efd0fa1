// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 联盟伙伴仓库接口
pub mod affiliate_repository;
/// 客户仓库接口
pub mod customer_repository;
/// 订单仓库接口
pub mod order_repository;
/// 平台仓库接口
pub mod platform_repository;
/// 产品仓库接口
pub mod product_repository;
/// 订阅仓库接口
pub mod subscription_repository;
/// 对账日志仓库接口
pub mod sync_log_repository;
/// 交易仓库接口
pub mod transaction_repository;
/// Webhook事件仓库接口
pub mod webhook_event_repository;
