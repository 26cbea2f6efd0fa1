// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 联盟伙伴等级枚举
///
/// 由累计归因收入按固定断点推导，收入单位与平台基准货币一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffiliateTier {
    /// 铜牌：累计收入 <= 10,000
    Bronze,
    /// 银牌：10,001 – 50,000
    Silver,
    /// 金牌：50,001 – 100,000
    Gold,
    /// 钻石：> 100,000
    Diamond,
}

impl AffiliateTier {
    /// 按累计收入计算等级
    pub fn from_revenue(total_revenue: i64) -> Self {
        if total_revenue > 100_000 {
            AffiliateTier::Diamond
        } else if total_revenue > 50_000 {
            AffiliateTier::Gold
        } else if total_revenue > 10_000 {
            AffiliateTier::Silver
        } else {
            AffiliateTier::Bronze
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AffiliateTier::Bronze => "bronze",
            AffiliateTier::Silver => "silver",
            AffiliateTier::Gold => "gold",
            AffiliateTier::Diamond => "diamond",
        }
    }
}

impl fmt::Display for AffiliateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AffiliateTier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bronze" => Ok(AffiliateTier::Bronze),
            "silver" => Ok(AffiliateTier::Silver),
            "gold" => Ok(AffiliateTier::Gold),
            "diamond" => Ok(AffiliateTier::Diamond),
            _ => Err(()),
        }
    }
}
