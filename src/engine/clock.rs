// ==========================================
// 饲料装车看板 - 时钟注入
// ==========================================
// 红线: 引擎内所有 "当前时间" 必须来自注入的时钟
// ==========================================

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// 时间源
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟 (生产环境)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 手动时钟 (测试/回放)
///
/// 只在调用 `set` / `advance` 时前进
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// 设置当前时间
    pub fn set(&self, at: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard = at;
    }

    /// 前进指定时长,返回新的当前时间
    pub fn advance(&self, by: Duration) -> DateTime<Utc> {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
        *guard
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_advance() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
        let clock = ManualClock::new(t0);
        assert_eq!(clock.now(), t0);

        let t1 = clock.advance(Duration::minutes(45));
        assert_eq!(t1, t0 + Duration::minutes(45));
        assert_eq!(clock.now(), t1);

        clock.set(t0);
        assert_eq!(clock.now(), t0);
    }
}
