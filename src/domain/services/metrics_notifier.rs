// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 指标重算信号
//!
//! 每次成功持久化后向指标引擎发出"为平台X重算Y日指标"的信号。
//! 信号是尽力而为的：发送失败只记日志，绝不反过来让事件重试。

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

/// 指标重算信号接口
#[async_trait]
pub trait MetricsNotifier: Send + Sync {
    /// 请求重算指定平台、指定日期的指标
    async fn recalculate(&self, platform_id: Uuid, date: NaiveDate) -> anyhow::Result<()>;
}

/// 默认实现：记一条计数器与日志
///
/// 指标引擎本体在进程外，这里只负责把信号打出去。
pub struct CounterMetricsNotifier;

#[async_trait]
impl MetricsNotifier for CounterMetricsNotifier {
    async fn recalculate(&self, platform_id: Uuid, date: NaiveDate) -> anyhow::Result<()> {
        metrics::counter!("paysync_metrics_recalc_signals_total").increment(1);
        debug!(%platform_id, %date, "Metrics recalculation signal emitted");
        Ok(())
    }
}
