// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 事件工作器模块
pub mod event_worker;
/// 工作管理器模块
pub mod manager;
/// 对账调度器模块
pub mod sync_worker;
