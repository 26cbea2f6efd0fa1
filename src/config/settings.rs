// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含数据库、服务器、工作器、对账和重试等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 服务器配置
    pub server: ServerSettings,
    /// 工作器配置
    pub workers: WorkerSettings,
    /// 对账配置
    pub sync: SyncSettings,
    /// 重试配置
    pub retry: RetrySettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 数据库配置设置
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: u32,
    /// 最小连接数
    pub min_connections: u32,
    /// 连接超时时间（秒）
    pub connect_timeout: u64,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: u64,
}

/// 服务器配置设置
#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 工作器配置设置
#[derive(Debug, Deserialize)]
pub struct WorkerSettings {
    /// 事件工作器数量
    pub event_worker_count: usize,
    /// 每轮批量认领的事件数
    pub event_batch_size: u64,
    /// 轮询间隔（秒）
    pub poll_interval_secs: u64,
    /// 单个工作器内的事件并发度
    pub event_concurrency: usize,
}

/// 对账配置设置
#[derive(Debug, Deserialize)]
pub struct SyncSettings {
    /// 对账周期（小时）
    pub interval_hours: u64,
    /// 上游分页大小
    pub page_size: u32,
    /// 缺失记录告警阈值
    pub missing_threshold: i32,
}

/// 重试配置设置
#[derive(Debug, Deserialize)]
pub struct RetrySettings {
    /// 最大重试次数
    pub max_retries: u32,
    /// 初始退避时间（秒）
    pub base_delay_secs: u64,
    /// 最大退避时间（秒）
    pub cap_delay_secs: u64,
}

/// 指标配置设置
#[derive(Debug, Deserialize)]
pub struct MetricsSettings {
    /// Prometheus导出器监听地址
    pub listen_addr: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Start with default settings
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            // Default DB pool settings
            .set_default("database.url", "postgres://localhost:5432/paysyncrs")?
            .set_default("database.max_connections", 100)?
            .set_default("database.min_connections", 10)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Default worker settings
            .set_default("workers.event_worker_count", 2)?
            .set_default("workers.event_batch_size", 50)?
            .set_default("workers.poll_interval_secs", 5)?
            .set_default("workers.event_concurrency", 8)?
            // Default sync settings
            .set_default("sync.interval_hours", 6)?
            .set_default("sync.page_size", 1000)?
            .set_default("sync.missing_threshold", 10)?
            // Default retry settings
            .set_default("retry.max_retries", 5)?
            .set_default("retry.base_delay_secs", 30)?
            .set_default("retry.cap_delay_secs", 3600)?
            // Default metrics settings
            .set_default("metrics.listen_addr", "0.0.0.0:9000")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("PAYSYNCRS").separator("__"));

        builder.build()?.try_deserialize()
    }
}
