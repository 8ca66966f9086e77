use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::Quota;
use std::num::NonZeroU32;

/// 1分あたりの上限から間隔を決める
///
/// バーストは1件に抑える。どの60秒を切り取っても上限を超えない。
pub fn quota_per_minute(max_requests: usize) -> Quota {
    let max = u32::try_from(max_requests)
        .ok()
        .and_then(NonZeroU32::new)
        .unwrap_or(NonZeroU32::MIN);
    Quota::per_minute(max).allow_burst(NonZeroU32::MIN)
}

/// 画像生成APIのレート制御
pub struct RateLimiter {
    limiter: governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl RateLimiter {
    pub fn per_minute(max_requests: usize) -> Self {
        Self {
            limiter: governor::RateLimiter::direct(quota_per_minute(max_requests)),
        }
    }

    /// 枠が空くまで待つ
    pub async fn acquire(&self) {
        if self.limiter.check().is_err() {
            tracing::info!("レート制限: 待機します");
            self.limiter.until_ready().await;
        }
    }
}
