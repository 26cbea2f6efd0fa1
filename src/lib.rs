// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体、服务和仓库接口
pub mod domain;

/// Webhook处理器模块
///
/// 将各平台的原生事件负载翻译为规范化片段
pub mod handlers;

/// 基础设施模块
///
/// 提供外部服务集成，如数据库和可观测性
pub mod infrastructure;

/// 表示层模块
///
/// 处理HTTP请求和响应，包括路由、处理器和错误
pub mod presentation;

/// 平台适配器模块
///
/// 封装各支付平台的API访问与规范化转换
pub mod providers;

/// 队列模块
///
/// 实现持久化事件队列
pub mod queue;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 实现后台事件处理与对账调度
pub mod workers;
