//! 跨轮次退避
//!
//! 未分类失败后，同一条提交在退避窗口结束前不会再被尝试。
//! 窗口 = min(base * 2^(attempts-1), max)，再加最多 20% 的抖动。
//! 抖动由提交 id 决定，同一条提交每次算出的窗口相同。

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::Config;
use crate::storage::DeliveryAttempts;

const JITTER_RATIO: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_millis(config.backoff_base_ms),
            Duration::from_millis(config.backoff_max_ms),
        )
    }

    /// 第 `attempts` 次失败后的等待时长
    pub fn delay(&self, id: Uuid, attempts: u32) -> Duration {
        if attempts == 0 || self.base.is_zero() {
            return Duration::ZERO;
        }
        let exponent = (attempts - 1).min(31);
        let raw = self.base.saturating_mul(1u32 << exponent).min(self.max);

        raw + raw.mul_f64(JITTER_RATIO * jitter_fraction(id))
    }

    /// 退避窗口结束时间，没有失败记录时返回 `None`
    pub fn retry_at(&self, id: Uuid, attempts: &DeliveryAttempts) -> Option<DateTime<Utc>> {
        let delay = self.delay(id, attempts.attempts);
        if delay.is_zero() {
            return None;
        }
        let delay = chrono::Duration::from_std(delay).ok()?;
        Some(attempts.last_failure_at + delay)
    }

    pub fn is_ready(&self, id: Uuid, attempts: Option<&DeliveryAttempts>, now: DateTime<Utc>) -> bool {
        match attempts.and_then(|a| self.retry_at(id, a)) {
            Some(retry_at) => now >= retry_at,
            None => true,
        }
    }
}

/// [0, 1) 之间的稳定值
fn jitter_fraction(id: Uuid) -> f64 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    (hasher.finish() % 1_000) as f64 / 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_secs(2), Duration::from_secs(60))
    }

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let id = Uuid::new_v4();
        let p = policy();
        let within = |d: Duration, raw: u64| {
            d >= Duration::from_secs(raw) && d <= Duration::from_secs(raw).mul_f64(1.0 + JITTER_RATIO)
        };

        assert_eq!(p.delay(id, 0), Duration::ZERO);
        assert!(within(p.delay(id, 1), 2));
        assert!(within(p.delay(id, 2), 4));
        assert!(within(p.delay(id, 3), 8));
        assert!(within(p.delay(id, 10), 60));
        assert!(within(p.delay(id, 200), 60));
        assert_eq!(p.delay(id, 3), p.delay(id, 3));
    }

    #[test]
    fn readiness_follows_last_failure() {
        let id = Uuid::new_v4();
        let p = policy();
        let failed_at = Utc::now();
        let attempts = DeliveryAttempts {
            attempts: 1,
            last_failure_at: failed_at,
            last_error: "boom".to_string(),
        };

        assert!(p.is_ready(id, None, failed_at));
        assert!(!p.is_ready(id, Some(&attempts), failed_at + chrono::Duration::seconds(1)));
        assert!(p.is_ready(id, Some(&attempts), failed_at + chrono::Duration::seconds(3)));
    }

    #[test]
    fn zero_base_disables_backoff() {
        let p = BackoffPolicy::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(p.delay(Uuid::new_v4(), 5), Duration::ZERO);
    }
}
