//! Availability Synchronizer
//!
//! Keeps a local availability snapshot current through push and pull:
//!
//! ```text
//!   start ──► Uncertain ──(push signal)──► PushActive   (poll paused)
//!                 │
//!                 └──(grace period, no push)──► PollActive ──(push signal)──► PushActive
//! ```
//!
//! All timers and the push receiver are owned by one worker task, so they
//! are released together on `stop()`. The poll timer is armed at start and
//! first fires one interval later; its ticks are no-ops while PushActive. A
//! push signal never carries state: it always triggers a full re-pull.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared::{AvailabilityPayload, AvailabilitySnapshot, SyncChannel};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::error::{SyncError, SyncResult};
use super::source::{ChangeSignal, PushSource, PushSubscription, SnapshotSource};

/// Which channel is trusted right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Started, no push signal yet, grace period running; polling already on
    Uncertain,
    /// Push delivered at least once; polling paused
    PushActive,
    /// Grace period passed without push; still pulling every poll interval
    PollActive,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uncertain => f.write_str("uncertain"),
            Self::PushActive => f.write_str("push_active"),
            Self::PollActive => f.write_str("poll_active"),
        }
    }
}

/// Synchronizer timing
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How long to wait for a first push signal before polling
    pub grace_period: Duration,
    pub poll_interval: Duration,
    /// Upper bound for a single pull
    pub fetch_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(10),
            poll_interval: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(5),
        }
    }
}

impl SyncConfig {
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

/// Called with every freshly pulled snapshot
///
/// Runs on the worker task while the delivery gate is held: it must not call
/// [`AvailabilitySynchronizer::stop`].
pub type UpdateCallback = Arc<dyn Fn(&AvailabilitySnapshot) + Send + Sync>;

struct Shared {
    state: Mutex<SyncState>,
    snapshot: Mutex<Option<AvailabilitySnapshot>>,
    /// Open while a session runs. `stop()` closes it before returning, so no
    /// callback can start afterwards.
    gate: Mutex<bool>,
}

impl Shared {
    fn transition(&self, to: SyncState) {
        let from = std::mem::replace(&mut *self.state.lock(), to);
        if from != to {
            tracing::info!(from = %from, to = %to, "Availability sync state changed");
        }
    }
}

struct Session {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// 可用性同步器
pub struct AvailabilitySynchronizer {
    pull: Arc<dyn SnapshotSource>,
    push: Arc<dyn PushSource>,
    config: SyncConfig,
    shared: Arc<Shared>,
    session: Mutex<Option<Session>>,
}

impl AvailabilitySynchronizer {
    pub fn new(pull: Arc<dyn SnapshotSource>, push: Arc<dyn PushSource>, config: SyncConfig) -> Self {
        Self {
            pull,
            push,
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(SyncState::Uncertain),
                snapshot: Mutex::new(None),
                gate: Mutex::new(false),
            }),
            session: Mutex::new(None),
        }
    }

    /// Start a session.
    ///
    /// 1. Seed pull (a failure is logged; the session still starts)
    /// 2. Subscribe to push (a failure leaves polling as the only channel)
    /// 3. Spawn the worker owning the grace timer, poll interval and push receiver
    pub async fn start<F>(&self, on_update: F) -> SyncResult<()>
    where
        F: Fn(&AvailabilitySnapshot) + Send + Sync + 'static,
    {
        let cancel = CancellationToken::new();
        {
            let mut session = self.session.lock();
            if session.is_some() {
                return Err(SyncError::AlreadyRunning);
            }
            *session = Some(Session {
                cancel: cancel.clone(),
                handle: None,
            });
        }

        self.shared.transition(SyncState::Uncertain);
        *self.shared.gate.lock() = true;
        tracing::info!(
            grace_ms = self.config.grace_period.as_millis() as u64,
            poll_ms = self.config.poll_interval.as_millis() as u64,
            "Availability synchronizer starting"
        );

        let worker = SyncWorker {
            pull: self.pull.clone(),
            config: self.config.clone(),
            shared: self.shared.clone(),
            on_update: Arc::new(on_update),
            cancel: cancel.clone(),
        };

        // Seed pull
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = worker.pull_and_deliver(SyncChannel::Pull) => {}
        }

        let subscription = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            result = self.push.subscribe() => match result {
                Ok(sub) => Some(sub),
                Err(e) => {
                    tracing::warn!(error = %e, "Push subscription failed, relying on polling");
                    None
                }
            },
        };

        let handle = tokio::spawn(worker.run(subscription));

        let mut session = self.session.lock();
        match session.as_mut() {
            // an uncancelled token means no stop() since, so the session is ours
            Some(current) if !cancel.is_cancelled() => {
                current.handle = Some(handle);
            }
            // stopped while seeding
            _ => handle.abort(),
        }
        Ok(())
    }

    /// Stop the session. Idempotent.
    ///
    /// After this returns no further `on_update` call starts, and all timers
    /// and the push subscription are released.
    pub fn stop(&self) {
        let Some(session) = self.session.lock().take() else {
            return;
        };

        *self.shared.gate.lock() = false;
        session.cancel.cancel();
        if let Some(handle) = session.handle {
            handle.abort();
        }
        tracing::info!("Availability synchronizer stopped");
    }

    pub fn state(&self) -> SyncState {
        *self.shared.state.lock()
    }

    /// Last successfully pulled snapshot
    pub fn snapshot(&self) -> Option<AvailabilitySnapshot> {
        self.shared.snapshot.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.session.lock().is_some()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }
}

impl Drop for AvailabilitySynchronizer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Session worker: sole owner of the timers and the push receiver
struct SyncWorker {
    pull: Arc<dyn SnapshotSource>,
    config: SyncConfig,
    shared: Arc<Shared>,
    on_update: UpdateCallback,
    cancel: CancellationToken,
}

impl SyncWorker {
    async fn run(self, mut push_rx: Option<PushSubscription>) {
        tracing::debug!("Availability sync worker started");

        let grace = tokio::time::sleep(self.config.grace_period);
        tokio::pin!(grace);
        let mut grace_pending = true;
        let mut poll = self.poll_interval();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,

                _ = &mut grace, if grace_pending => {
                    grace_pending = false;
                    if *self.shared.state.lock() == SyncState::Uncertain {
                        tracing::warn!("No push signal within grace period, falling back to polling");
                        self.shared.transition(SyncState::PollActive);
                    }
                }

                _ = poll.tick() => {
                    let state = *self.shared.state.lock();
                    if state != SyncState::PushActive {
                        self.pull_and_deliver(SyncChannel::Pull).await;
                    }
                }

                signal = recv_signal(&mut push_rx) => match signal {
                    Some(signal) => {
                        let coalesced = drain_pending(&mut push_rx);
                        tracing::debug!(entity = ?signal.entity, coalesced, "Push change signal received");
                        self.shared.transition(SyncState::PushActive);
                        self.pull_and_deliver(SyncChannel::Push).await;
                    }
                    None => {
                        tracing::warn!("Push subscription closed");
                        push_rx = None;
                    }
                },
            }
        }

        tracing::debug!("Availability sync worker stopped");
    }

    /// Poll timer; its first tick fires one period after start
    fn poll_interval(&self) -> Interval {
        let period = self.config.poll_interval.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    /// Pull a snapshot and hand it to the callback. Failures keep the last snapshot.
    async fn pull_and_deliver(&self, channel: SyncChannel) {
        match self.fetch().await {
            Ok(payload) => self.deliver(AvailabilitySnapshot::from_payload(payload, channel)),
            Err(e) => {
                tracing::warn!(error = %e, channel = ?channel, "Availability pull failed, keeping last snapshot");
            }
        }
    }

    async fn fetch(&self) -> SyncResult<AvailabilityPayload> {
        match tokio::time::timeout(self.config.fetch_timeout, self.pull.fetch_snapshot()).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(self.config.fetch_timeout)),
        }
    }

    fn deliver(&self, snapshot: AvailabilitySnapshot) {
        let gate = self.shared.gate.lock();
        if !*gate || self.cancel.is_cancelled() {
            return;
        }
        *self.shared.snapshot.lock() = Some(snapshot.clone());
        (self.on_update)(&snapshot);
    }
}

async fn recv_signal(rx: &mut Option<PushSubscription>) -> Option<ChangeSignal> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Discard signals already queued; one re-pull covers them all
fn drain_pending(rx: &mut Option<PushSubscription>) -> usize {
    let Some(rx) = rx else {
        return 0;
    };
    let mut drained = 0;
    while rx.try_recv().is_ok() {
        drained += 1;
    }
    drained
}
