// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 金额规整工具
//!
//! 所有金额在进入规范模型前统一为整数最小货币单位（如美分）。
//! 这里是整条流水线上货币精度的唯一转换点。

/// 将十进制主单位金额转换为最小货币单位
///
/// # 参数
///
/// * `major` - 主单位金额（如 29.90）
///
/// # 返回值
///
/// 返回四舍五入后的最小单位整数金额（如 2990）
pub fn major_to_minor(major: f64) -> i64 {
    (major * 100.0).round() as i64
}
