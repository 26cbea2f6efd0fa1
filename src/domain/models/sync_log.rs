// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 对账日志实体
///
/// 一条记录对应一个平台、一种记录类型的一次对账尝试。
/// 运行开始时创建（running），结束时恰好更新一次（completed或failed），
/// 之后不可变，只用于读侧统计。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLog {
    /// 日志唯一标识符
    pub id: Uuid,
    /// 所属平台ID
    pub platform_id: Uuid,
    /// 对账记录类型
    pub sync_type: SyncType,
    /// 运行状态
    pub status: SyncStatus,
    /// 开始时间
    pub started_at: DateTime<Utc>,
    /// 结束时间
    pub completed_at: Option<DateTime<Utc>>,
    /// 检测到漂移并已修正的记录数
    pub records_synced: i32,
    /// 单条处理失败的记录数
    pub records_failed: i32,
    /// 本地缺失、已合成补录事件的记录数
    pub missing_records_found: i32,
    /// 整批失败时的错误详情
    pub error_details: Option<String>,
}

impl SyncLog {
    /// 开启一次对账运行
    pub fn start(platform_id: Uuid, sync_type: SyncType) -> Self {
        Self {
            id: Uuid::new_v4(),
            platform_id,
            sync_type,
            status: SyncStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            records_synced: 0,
            records_failed: 0,
            missing_records_found: 0,
            error_details: None,
        }
    }

    /// 以完成状态收尾
    pub fn complete(&mut self) {
        self.status = SyncStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// 以失败状态收尾
    pub fn fail(&mut self, error: String) {
        self.status = SyncStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error_details = Some(error);
    }
}

/// 对账记录类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    /// 订阅对账
    Subscriptions,
    /// 交易对账
    Transactions,
    /// 客户对账
    Customers,
}

impl SyncType {
    /// 全部对账类型，按执行顺序
    pub const ALL: [SyncType; 3] = [
        SyncType::Subscriptions,
        SyncType::Transactions,
        SyncType::Customers,
    ];
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncType::Subscriptions => write!(f, "subscriptions"),
            SyncType::Transactions => write!(f, "transactions"),
            SyncType::Customers => write!(f, "customers"),
        }
    }
}

impl FromStr for SyncType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscriptions" => Ok(SyncType::Subscriptions),
            "transactions" => Ok(SyncType::Transactions),
            "customers" => Ok(SyncType::Customers),
            _ => Err(()),
        }
    }
}

/// 对账运行状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// 运行中
    #[default]
    Running,
    /// 已完成
    Completed,
    /// 已失败
    Failed,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Running => write!(f, "running"),
            SyncStatus::Completed => write!(f, "completed"),
            SyncStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for SyncStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(SyncStatus::Running),
            "completed" => Ok(SyncStatus::Completed),
            "failed" => Ok(SyncStatus::Failed),
            _ => Err(()),
        }
    }
}
