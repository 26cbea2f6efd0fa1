// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 数据库实体模块
///
/// 定义数据库表对应的实体结构
/// 使用SeaORM框架进行对象关系映射
/// 包含所有业务实体的数据库表示
pub mod affiliate;
pub mod customer;
pub mod order;
pub mod platform;
pub mod platform_credential;
pub mod product;
pub mod subscription;
pub mod sync_log;
pub mod transaction;
pub mod transaction_allocation;
pub mod webhook_event;
