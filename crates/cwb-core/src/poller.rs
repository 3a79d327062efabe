//! Polling engine.
//!
//! On a fixed cadence, sweeps every monitoring session: asks the status
//! source for the clinic's serving number (with bounded retry), classifies it
//! against the user's ticket, then applies the session mutation and sends the push the
//! policy calls for. Sessions are checked concurrently and independently.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use tokio::sync::{Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    domain::UserId,
    locks::UserLocks,
    messages::Messages,
    messaging::port::MessagingPort,
    policy::{classify, Decision, Mutation, Outcome},
    session::{Session, SessionPatch, SessionStore},
    status::{FailureKind, RemoteStatus, StatusError, StatusSource},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Total attempts per check, including the first.
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    /// Upper bound on concurrent checks within a sweep (`None` = unbounded).
    pub max_concurrent: Option<usize>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
            max_concurrent: None,
        }
    }
}

/// What happened to one session during a sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    Classified(Outcome),
    Closed,
    /// Every attempt failed; the user was told, the session kept.
    Failed(FailureKind),
    /// A check for this user from an earlier sweep is still running.
    Busy,
    /// The session was reset or changed while its status was being fetched.
    Stale,
    /// The store failed while applying the result.
    StoreError,
}

#[derive(Clone, Debug, Default)]
pub struct SweepReport {
    /// Sessions without both a target and a ticket.
    pub skipped: usize,
    pub checks: Vec<(UserId, CheckOutcome)>,
}

impl SweepReport {
    pub fn outcome_for(&self, user: &UserId) -> Option<CheckOutcome> {
        self.checks
            .iter()
            .find(|(u, _)| u == user)
            .map(|(_, o)| *o)
    }
}

#[derive(Clone)]
pub struct Poller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    cfg: PollerConfig,
    store: Arc<dyn SessionStore>,
    source: Arc<dyn StatusSource>,
    messenger: Arc<dyn MessagingPort>,
    locks: Arc<UserLocks>,
    messages: Messages,
    limiter: Option<Arc<Semaphore>>,
    in_flight: StdMutex<HashSet<UserId>>,
    runner: Mutex<Option<Runner>>,
}

struct Runner {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Marks a user as being checked; unmarks on drop.
struct InFlight {
    inner: Arc<PollerInner>,
    user: UserId,
}

impl InFlight {
    fn claim(inner: &Arc<PollerInner>, user: &UserId) -> Option<Self> {
        let mut set = inner
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !set.insert(user.clone()) {
            return None;
        }
        Some(Self {
            inner: inner.clone(),
            user: user.clone(),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut set = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        set.remove(&self.user);
    }
}

impl Poller {
    pub fn new(
        cfg: PollerConfig,
        store: Arc<dyn SessionStore>,
        source: Arc<dyn StatusSource>,
        messenger: Arc<dyn MessagingPort>,
        locks: Arc<UserLocks>,
        messages: Messages,
    ) -> Self {
        let limiter = cfg.max_concurrent.map(|n| Arc::new(Semaphore::new(n.max(1))));
        Self {
            inner: Arc::new(PollerInner {
                cfg,
                store,
                source,
                messenger,
                locks,
                messages,
                limiter,
                in_flight: StdMutex::new(HashSet::new()),
                runner: Mutex::new(None),
            }),
        }
    }

    /// Start the periodic sweep. The first sweep runs one interval from now.
    ///
    /// Returns `false` if the poller is already running.
    pub async fn start(&self) -> bool {
        let mut runner = self.inner.runner.lock().await;
        if runner.is_some() {
            return false;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let poller = self.clone();
        let period = self.inner.cfg.interval;
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut tick = tokio::time::interval_at(start, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tick.tick() => {
                        // A slow sweep must not delay the cadence.
                        let poller = poller.clone();
                        tokio::spawn(async move {
                            if let Err(e) = poller.sweep().await {
                                error!("sweep failed: {e}");
                            }
                        });
                    }
                }
            }
        });

        *runner = Some(Runner { cancel, handle });
        info!(interval_secs = period.as_secs_f64(), "poller started");
        true
    }

    /// Stop the periodic sweep. Checks already in progress run to completion.
    pub async fn stop(&self) {
        let Some(runner) = self.inner.runner.lock().await.take() else {
            return;
        };
        runner.cancel.cancel();
        if let Err(e) = runner.handle.await {
            warn!("poller task ended abnormally: {e}");
        }
        info!("poller stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.inner.runner.lock().await.is_some()
    }

    /// Run one sweep over all sessions and wait for every check to finish.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let sessions = self.inner.store.list_all().await?;
        let mut report = SweepReport::default();
        let mut tasks = JoinSet::new();

        for session in sessions {
            if !session.is_monitoring() {
                debug!(user = %session.user_id, "skipping check: missing url or number");
                report.skipped += 1;
                continue;
            }

            let Some(claim) = InFlight::claim(&self.inner, &session.user_id) else {
                debug!(user = %session.user_id, "previous check still running");
                report.checks.push((session.user_id, CheckOutcome::Busy));
                continue;
            };

            let poller = self.clone();
            let limiter = self.inner.limiter.clone();
            tasks.spawn(async move {
                let _permit = match limiter {
                    Some(sem) => sem.acquire_owned().await.ok(),
                    None => None,
                };
                let _claim = claim;
                let user = session.user_id.clone();
                let outcome = poller.check_session(session).await;
                (user, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(check) => report.checks.push(check),
                Err(e) => error!("session check panicked: {e}"),
            }
        }

        Ok(report)
    }

    async fn check_session(&self, session: Session) -> CheckOutcome {
        let (Some(url), Some(ticket)) = (session.target_url.clone(), session.ticket_number)
        else {
            return CheckOutcome::Stale;
        };
        let user = &session.user_id;

        info!(user = %user, url = %url, "checking status");
        match self.fetch_with_retry(user, &url).await {
            Ok(status) => self.apply_status(&session, status, ticket).await,
            Err(e) => {
                let kind = e.kind();
                error!(
                    user = %user,
                    attempts = self.inner.cfg.retry_attempts,
                    "status check failed: {e}"
                );
                if let Some(notice) = Decision::for_failure(kind).notice {
                    self.notify(user, &self.inner.messages.render(&notice))
                        .await;
                }
                CheckOutcome::Failed(kind)
            }
        }
    }

    async fn fetch_with_retry(
        &self,
        user: &UserId,
        url: &str,
    ) -> std::result::Result<RemoteStatus, StatusError> {
        let attempts = self.inner.cfg.retry_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.inner.source.fetch_status(url).await {
                Ok(status) => return Ok(status),
                Err(e) if attempt < attempts => {
                    warn!(user = %user, attempt, "retrying status check: {e}");
                    sleep(self.inner.cfg.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn apply_status(
        &self,
        checked: &Session,
        status: RemoteStatus,
        ticket: u32,
    ) -> CheckOutcome {
        let user = &checked.user_id;
        let guard = self.inner.locks.lock_user(user).await;

        // The user may have reset or re-registered while we were fetching.
        let current = match self.inner.store.get(user).await {
            Ok(Some(s)) if s.same_watch(checked) => s,
            Ok(_) => {
                info!(user = %user, "session changed during check, dropping result");
                return CheckOutcome::Stale;
            }
            Err(e) => {
                error!(user = %user, "failed to reload session: {e}");
                return CheckOutcome::StoreError;
            }
        };

        let outcome = match status {
            RemoteStatus::Closed => {
                info!(user = %user, "non-business hours");
                CheckOutcome::Closed
            }
            RemoteStatus::Serving(n) => {
                let o = classify(n, ticket);
                info!(user = %user, current = n, ticket, outcome = ?o, "classified");
                CheckOutcome::Classified(o)
            }
        };

        let decision = Decision::for_status(status, ticket, current.notified);
        let applied = match decision.mutation {
            Mutation::Keep => Ok(()),
            Mutation::Destroy => self.inner.store.delete(user).await.map(|_| ()),
            Mutation::MarkNotified => self
                .inner
                .store
                .update(user, SessionPatch::notified(true))
                .await
                .map(|_| ()),
        };
        drop(guard);

        if let Err(e) = applied {
            // Unrecorded mutation: skip the push.
            error!(user = %user, mutation = ?decision.mutation, "failed to update session: {e}");
            return CheckOutcome::StoreError;
        }

        if let Some(notice) = decision.notice {
            self.notify(user, &self.inner.messages.render(&notice))
                .await;
        }
        outcome
    }

    /// Best-effort push; delivery failures are logged, never propagated.
    async fn notify(&self, user: &UserId, text: &str) {
        match self.inner.messenger.deliver(user, text).await {
            Ok(()) => debug!(user = %user, "notification delivered"),
            Err(e) => error!(user = %user, "failed to deliver notification: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::messages::Locale;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const URL: &str = "https://clinic.example/wait";

    /// Scripted status source: per-URL queue of results, then a fallback.
    #[derive(Default)]
    struct FakeSource {
        scripts: StdMutex<HashMap<String, VecDeque<std::result::Result<RemoteStatus, StatusError>>>>,
        calls: AtomicUsize,
        call_times: StdMutex<Vec<tokio::time::Instant>>,
    }

    impl FakeSource {
        fn script(
            &self,
            url: &str,
            results: Vec<std::result::Result<RemoteStatus, StatusError>>,
        ) {
            self.scripts
                .lock()
                .unwrap()
                .insert(url.to_string(), results.into());
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusSource for FakeSource {
        async fn fetch_status(
            &self,
            target_url: &str,
        ) -> std::result::Result<RemoteStatus, StatusError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.call_times
                .lock()
                .unwrap()
                .push(tokio::time::Instant::now());
            self.scripts
                .lock()
                .unwrap()
                .get_mut(target_url)
                .and_then(|q| q.pop_front())
                .unwrap_or_else(|| Err(StatusError::Transport("no script".to_string())))
        }
    }

    #[derive(Default)]
    struct FakeMessenger {
        sent: StdMutex<Vec<(UserId, String)>>,
        fail: std::sync::atomic::AtomicBool,
    }

    impl FakeMessenger {
        fn sent(&self) -> Vec<(UserId, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        async fn deliver(&self, user: &UserId, text: &str) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::External("telegram down".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((user.clone(), text.to_string()));
            Ok(())
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        source: Arc<FakeSource>,
        messenger: Arc<FakeMessenger>,
        poller: Poller,
        messages: Messages,
    }

    fn harness() -> Harness {
        harness_with(PollerConfig {
            retry_delay: Duration::ZERO,
            ..PollerConfig::default()
        })
    }

    fn harness_with(cfg: PollerConfig) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(FakeSource::default());
        let messenger = Arc::new(FakeMessenger::default());
        let messages = Messages::for_locale(Locale::En);
        let poller = Poller::new(
            cfg,
            store.clone(),
            source.clone(),
            messenger.clone(),
            Arc::new(UserLocks::new()),
            messages.clone(),
        );
        Harness {
            store,
            source,
            messenger,
            poller,
            messages,
        }
    }

    async fn register(store: &MemoryStore, user: &str, url: &str, ticket: u32) -> UserId {
        let u = UserId::new(user);
        store.create(&u).await.unwrap();
        store.update(&u, SessionPatch::target(url)).await.unwrap();
        store.update(&u, SessionPatch::ticket(ticket)).await.unwrap();
        u
    }

    #[tokio::test]
    async fn scenario_waiting_then_approaching_then_called() {
        let h = harness();
        let u = register(&h.store, "u1", URL, 12).await;
        h.source.script(
            URL,
            vec![
                Ok(RemoteStatus::Serving(5)),
                Ok(RemoteStatus::Serving(10)),
                Ok(RemoteStatus::Serving(11)),
                Ok(RemoteStatus::Serving(12)),
            ],
        );

        let r = h.poller.sweep().await.unwrap();
        assert_eq!(
            r.outcome_for(&u),
            Some(CheckOutcome::Classified(Outcome::Waiting))
        );
        assert!(h.messenger.sent().is_empty());
        assert!(!h.store.get(&u).await.unwrap().unwrap().notified);

        let r = h.poller.sweep().await.unwrap();
        assert_eq!(
            r.outcome_for(&u),
            Some(CheckOutcome::Classified(Outcome::Approaching))
        );
        assert!(h.store.get(&u).await.unwrap().unwrap().notified);
        assert_eq!(
            h.messenger.sent(),
            vec![(u.clone(), h.messages.approaching(10, 12))]
        );

        // Still approaching: no duplicate push.
        h.poller.sweep().await.unwrap();
        assert_eq!(h.messenger.sent().len(), 1);

        let r = h.poller.sweep().await.unwrap();
        assert_eq!(
            r.outcome_for(&u),
            Some(CheckOutcome::Classified(Outcome::AtNumber))
        );
        assert!(h.store.get(&u).await.unwrap().is_none());
        assert_eq!(h.messenger.sent()[1], (u.clone(), h.messages.at_number(12)));

        // Destroyed sessions are no longer polled.
        let calls = h.source.calls();
        let r = h.poller.sweep().await.unwrap();
        assert!(r.checks.is_empty());
        assert_eq!(h.source.calls(), calls);
    }

    #[tokio::test]
    async fn missed_ticket_destroys_session() {
        let h = harness();
        let u = register(&h.store, "u1", URL, 12).await;
        h.source.script(URL, vec![Ok(RemoteStatus::Serving(14))]);

        let r = h.poller.sweep().await.unwrap();
        assert_eq!(
            r.outcome_for(&u),
            Some(CheckOutcome::Classified(Outcome::Missed))
        );
        assert!(h.store.get(&u).await.unwrap().is_none());
        assert_eq!(h.messenger.sent(), vec![(u, h.messages.missed_number(12, 14))]);
    }

    #[tokio::test]
    async fn closed_clinic_destroys_session() {
        let h = harness();
        let u = register(&h.store, "u1", URL, 12).await;
        h.source.script(URL, vec![Ok(RemoteStatus::Closed)]);

        let r = h.poller.sweep().await.unwrap();
        assert_eq!(r.outcome_for(&u), Some(CheckOutcome::Closed));
        assert!(h.store.get(&u).await.unwrap().is_none());
        assert_eq!(
            h.messenger.sent(),
            vec![(u, h.messages.non_business_hours.to_string())]
        );
    }

    #[tokio::test]
    async fn incomplete_sessions_are_skipped() {
        let h = harness();
        let a = UserId::new("a");
        h.store.create(&a).await.unwrap();
        let b = UserId::new("b");
        h.store.create(&b).await.unwrap();
        h.store.update(&b, SessionPatch::target(URL)).await.unwrap();

        let r = h.poller.sweep().await.unwrap();
        assert_eq!(r.skipped, 2);
        assert!(r.checks.is_empty());
        assert_eq!(h.source.calls(), 0);
    }

    #[tokio::test]
    async fn transient_failures_then_success_apply_once() {
        let h = harness();
        let u = register(&h.store, "u1", URL, 12).await;
        h.source.script(
            URL,
            vec![
                Err(StatusError::Transport("reset by peer".to_string())),
                Err(StatusError::Timeout),
                Ok(RemoteStatus::Serving(10)),
            ],
        );

        let r = h.poller.sweep().await.unwrap();
        assert_eq!(h.source.calls(), 3);
        assert_eq!(
            r.outcome_for(&u),
            Some(CheckOutcome::Classified(Outcome::Approaching))
        );
        // Exactly one push: the approaching notice, no failure message.
        assert_eq!(h.messenger.sent(), vec![(u, h.messages.approaching(10, 12))]);
    }

    #[tokio::test]
    async fn exhausted_retries_notify_by_kind_and_keep_session() {
        for (err, kind) in [
            (
                StatusError::Resolution("no vcode".to_string()),
                FailureKind::InvalidTarget,
            ),
            (StatusError::Timeout, FailureKind::Timeout),
            (
                StatusError::Transport("502".to_string()),
                FailureKind::System,
            ),
            (
                StatusError::Data("no RTime".to_string()),
                FailureKind::System,
            ),
        ] {
            let h = harness();
            let u = register(&h.store, "u1", URL, 12).await;
            h.source.script(URL, vec![Err(err.clone()); 3]);

            let r = h.poller.sweep().await.unwrap();
            assert_eq!(h.source.calls(), 3, "{err:?}");
            assert_eq!(r.outcome_for(&u), Some(CheckOutcome::Failed(kind)));
            assert!(h.store.get(&u).await.unwrap().is_some());
            assert_eq!(
                h.messenger.sent(),
                vec![(u, h.messages.fetch_failed(kind).to_string())]
            );
        }
    }

    #[tokio::test]
    async fn delivery_failure_does_not_abort_sweep() {
        let h = harness();
        h.messenger.fail.store(true, Ordering::SeqCst);
        let a = register(&h.store, "a", "https://a.example/w", 12).await;
        let b = register(&h.store, "b", "https://b.example/w", 5).await;
        h.source
            .script("https://a.example/w", vec![Ok(RemoteStatus::Serving(12))]);
        h.source
            .script("https://b.example/w", vec![Ok(RemoteStatus::Serving(4))]);

        let r = h.poller.sweep().await.unwrap();
        assert_eq!(
            r.outcome_for(&a),
            Some(CheckOutcome::Classified(Outcome::AtNumber))
        );
        assert_eq!(
            r.outcome_for(&b),
            Some(CheckOutcome::Classified(Outcome::Approaching))
        );
        assert!(h.store.get(&a).await.unwrap().is_none());
        assert!(h.store.get(&b).await.unwrap().unwrap().notified);
    }

    #[tokio::test]
    async fn sessions_are_checked_independently() {
        let h = harness();
        let ok = register(&h.store, "ok", "https://ok.example/w", 20).await;
        let bad = register(&h.store, "bad", "https://bad.example/w", 20).await;
        h.source
            .script("https://ok.example/w", vec![Ok(RemoteStatus::Serving(1))]);

        let r = h.poller.sweep().await.unwrap();
        assert_eq!(
            r.outcome_for(&ok),
            Some(CheckOutcome::Classified(Outcome::Waiting))
        );
        assert_eq!(
            r.outcome_for(&bad),
            Some(CheckOutcome::Failed(FailureKind::System))
        );
    }

    #[tokio::test]
    async fn result_for_a_changed_session_is_dropped() {
        let h = harness();
        let u = register(&h.store, "u1", URL, 12).await;
        let checked = h.store.get(&u).await.unwrap().unwrap();

        // User reset and re-registered with another ticket mid-check.
        h.store.create(&u).await.unwrap();
        h.store.update(&u, SessionPatch::target(URL)).await.unwrap();
        h.store.update(&u, SessionPatch::ticket(30)).await.unwrap();

        let outcome = h
            .poller
            .apply_status(&checked, RemoteStatus::Serving(12), 12)
            .await;
        assert_eq!(outcome, CheckOutcome::Stale);
        assert!(h.messenger.sent().is_empty());
        assert_eq!(
            h.store.get(&u).await.unwrap().unwrap().ticket_number,
            Some(30)
        );
    }

    #[tokio::test]
    async fn user_with_check_in_flight_is_busy() {
        let h = harness();
        let u = register(&h.store, "u1", URL, 12).await;
        let _claim = InFlight::claim(&h.poller.inner, &u).unwrap();

        let r = h.poller.sweep().await.unwrap();
        assert_eq!(r.outcome_for(&u), Some(CheckOutcome::Busy));
        assert_eq!(h.source.calls(), 0);
    }

    #[tokio::test]
    async fn bounded_concurrency_still_checks_everyone() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(FakeSource::default());
        let messenger = Arc::new(FakeMessenger::default());
        let poller = Poller::new(
            PollerConfig {
                max_concurrent: Some(1),
                retry_delay: Duration::ZERO,
                ..PollerConfig::default()
            },
            store.clone(),
            source.clone(),
            messenger.clone(),
            Arc::new(UserLocks::new()),
            Messages::default(),
        );
        for i in 0..5 {
            let url = format!("https://c{i}.example/w");
            register(&store, &format!("u{i}"), &url, 50).await;
            source.script(&url, vec![Ok(RemoteStatus::Serving(1))]);
        }

        let r = poller.sweep().await.unwrap();
        assert_eq!(r.checks.len(), 5);
        assert!(r
            .checks
            .iter()
            .all(|(_, o)| *o == CheckOutcome::Classified(Outcome::Waiting)));
    }

    #[tokio::test]
    async fn start_stop_lifecycle() {
        let h = harness();
        assert!(!h.poller.is_running().await);
        assert!(h.poller.start().await);
        assert!(!h.poller.start().await);
        assert!(h.poller.is_running().await);
        h.poller.stop().await;
        assert!(!h.poller.is_running().await);
        // Stopping twice is harmless.
        h.poller.stop().await;
    }

    #[test]
    fn default_config_polls_every_30s_with_three_attempts() {
        let cfg = PollerConfig::default();
        assert_eq!(cfg.interval, Duration::from_secs(30));
        assert_eq!(cfg.retry_attempts, 3);
        assert_eq!(cfg.retry_delay, Duration::from_secs(1));
        assert_eq!(cfg.max_concurrent, None);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_are_spaced_by_the_retry_delay() {
        let h = harness_with(PollerConfig::default());
        let u = register(&h.store, "u1", URL, 12).await;
        h.source.script(
            URL,
            vec![
                Err(StatusError::Timeout),
                Err(StatusError::Timeout),
                Err(StatusError::Timeout),
            ],
        );

        let r = h.poller.sweep().await.unwrap();
        assert_eq!(
            r.outcome_for(&u),
            Some(CheckOutcome::Failed(FailureKind::Timeout))
        );

        let times = h.source.call_times.lock().unwrap().clone();
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
        assert_eq!(h.messenger.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_run_sweeps_until_stopped() {
        let h = harness_with(PollerConfig::default());
        let u = register(&h.store, "u1", URL, 12).await;
        h.source.script(URL, vec![Ok(RemoteStatus::Serving(10))]);

        assert!(h.poller.start().await);

        // First sweep is one interval out.
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(h.source.calls(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.source.calls(), 1);
        assert_eq!(
            h.messenger.sent(),
            vec![(u.clone(), h.messages.approaching(10, 12))]
        );
        assert!(h.store.get(&u).await.unwrap().unwrap().notified);

        h.poller.stop().await;
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(h.source.calls(), 1);
        assert_eq!(h.messenger.sent().len(), 1);
    }
}
