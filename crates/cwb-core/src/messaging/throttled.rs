use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{domain::UserId, messaging::port::MessagingPort, Result};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* outbound sends (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between sends to the same user (Telegram 1 msg/sec style limits).
    pub per_user_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40), // ~25/sec
            per_user_min_interval: Duration::from_millis(1050), // ~0.95/sec
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        self.reserve_at(Instant::now())
    }

    fn reserve_at(&mut self, now: Instant) -> Duration {
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// MessagingPort decorator that rate-limits outbound sends.
///
/// A sweep can produce a burst of pushes at once; spacing them out keeps the
/// bot clear of Telegram 429 errors without failing any delivery.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_user: Mutex<HashMap<UserId, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_user: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for_user(&self, user: &UserId) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_user.lock().await;
        // Drop limiters nobody holds whose slot has already passed.
        let now = Instant::now();
        map.retain(|_, lim| {
            Arc::strong_count(lim) > 1
                || lim.try_lock().map(|l| l.next > now).unwrap_or(true)
        });
        map.entry(user.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_user_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle_user(&self, user: &UserId) {
        let global_wait = { self.global.lock().await.reserve() };
        let user_wait = {
            let lim = self.limiter_for_user(user).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(user_wait);
        if wait > Duration::ZERO {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    async fn deliver(&self, user: &UserId, text: &str) -> Result<()> {
        self.throttle_user(user).await;
        self.inner.deliver(user, text).await
    }
}
