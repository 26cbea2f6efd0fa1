// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// 重试策略配置
///
/// Webhook事件处理失败后的指数退避策略。事件本身携带重试计数，
/// 这里只负责根据计数计算下一次重试的延迟。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 初始退避时间
    pub base_delay: Duration,
    /// 最大退避时间
    pub cap_delay: Duration,
    /// 抖动因子 (0.0-1.0)
    pub jitter_factor: f64,
    /// 是否启用抖动
    pub enable_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(30),
            cap_delay: Duration::from_secs(3600),
            jitter_factor: 0.1,
            enable_jitter: true,
        }
    }
}

impl RetryPolicy {
    /// 创建标准重试策略
    pub fn standard() -> Self {
        Self::default()
    }

    /// 计算第 retry_count 次失败后的退避时间
    ///
    /// 退避时间为 min(base * 2^retry_count, cap)，可选抖动。
    pub fn calculate_backoff(&self, retry_count: u32) -> Duration {
        let backoff_secs = self.base_delay.as_secs_f64() * 2f64.powi(retry_count as i32);
        let capped = backoff_secs.min(self.cap_delay.as_secs_f64());

        let final_backoff = if self.enable_jitter {
            let jitter_range = capped * self.jitter_factor;
            let jitter = rand::random_range(-jitter_range..=jitter_range);
            // 抖动后仍受上限约束
            (capped + jitter).clamp(0.0, self.cap_delay.as_secs_f64())
        } else {
            capped
        };

        Duration::from_secs_f64(final_backoff)
    }

    /// 计算下次重试时间
    pub fn next_retry_time(&self, retry_count: u32, base_time: DateTime<Utc>) -> DateTime<Utc> {
        let backoff = self.calculate_backoff(retry_count);
        base_time + chrono::Duration::milliseconds(backoff.as_millis() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> RetryPolicy {
        RetryPolicy {
            enable_jitter: false,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_backoff_monotone_and_capped() {
        let policy = no_jitter();
        let mut prev = Duration::ZERO;
        for r in 0..12 {
            let d = policy.calculate_backoff(r);
            assert!(d >= prev, "backoff must be non-decreasing");
            assert!(d <= policy.cap_delay, "backoff must never exceed the cap");
            prev = d;
        }
    }

    #[test]
    fn test_backoff_doubles_until_cap() {
        let policy = no_jitter();
        assert_eq!(policy.calculate_backoff(0), Duration::from_secs(30));
        assert_eq!(policy.calculate_backoff(1), Duration::from_secs(60));
        assert_eq!(policy.calculate_backoff(2), Duration::from_secs(120));
        // 30 * 2^10 would be far past the cap
        assert_eq!(policy.calculate_backoff(10), Duration::from_secs(3600));
    }

    #[test]
    fn test_jittered_backoff_stays_positive() {
        let policy = RetryPolicy::default();
        for r in 0..8 {
            assert!(policy.calculate_backoff(r) > Duration::ZERO);
        }
    }

    #[test]
    fn test_jittered_backoff_never_exceeds_cap() {
        let policy = RetryPolicy::default();
        // 在上限附近抖动最容易越界，多抽样几次
        for _ in 0..200 {
            let d = policy.calculate_backoff(10);
            assert!(d <= policy.cap_delay, "jittered backoff {d:?} exceeds cap");
        }
    }

    #[test]
    fn test_next_retry_time_is_in_the_future() {
        let policy = no_jitter();
        let now = Utc::now();
        let next = policy.next_retry_time(0, now);
        assert_eq!((next - now).num_seconds(), 30);
    }
}
