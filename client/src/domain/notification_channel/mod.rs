//! Push notification feed for privileged sessions.
//!
//! State machine:
//! `Disconnected -> Connecting -> Connected <-> Reconnecting -> Disconnected`.
//! The channel owns the in-memory feed, a bounded reconnect policy (jittered
//! exponential backoff) and a queue of read acknowledgements drained by the
//! connection loop. Feed operations are local and never wait on the network.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tokio::sync::{Notify, mpsc, watch};
use tracing::{debug, info, warn};

use super::ports::{NotificationConnection, NotificationTransport};
use super::{AccessToken, Notification, NotificationFeed, NotificationId, StoredSession};

mod policy;
mod runtime;

pub use policy::ReconnectPolicy;
pub use runtime::{AttemptJitter, ChannelRuntime, TokioSleeper};

/// Async sleeping abstraction for reconnect delays.
#[async_trait]
pub trait ReconnectSleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Reconnect backoff jitter abstraction.
pub trait BackoffJitter: Send + Sync {
    /// Return a jittered delay from the exponential base delay.
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration;
}

/// Why the channel is not connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// `run` has not been called for this session yet.
    NotStarted,
    /// The session's role does not receive notifications.
    Ineligible,
    /// Every reconnect attempt failed.
    RetriesExhausted,
    /// The channel was closed by its owner.
    TornDown,
}

impl DisconnectReason {
    /// Whether the UI should show a connectivity warning.
    pub const fn is_degraded(self) -> bool {
        matches!(self, Self::RetriesExhausted)
    }
}

/// Observable connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// No connection, for the given reason.
    Disconnected {
        /// Reason the channel is idle.
        reason: DisconnectReason,
    },
    /// First connection attempt in progress.
    Connecting,
    /// Receiving notifications.
    Connected,
    /// Waiting before, or performing, reconnect `attempt`.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
    },
}

/// How a call to [`NotificationChannel::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// The session's role does not receive notifications.
    Ineligible,
    /// Reconnection gave up after the configured number of attempts.
    RetriesExhausted,
    /// The channel was closed.
    TornDown,
    /// Another `run` call already owns the connection.
    AlreadyRunning,
}

enum Pump {
    Shutdown,
    Dropped(String),
}

/// Session generation and whether it was closed.
///
/// `reset` starts a new generation, so a loop still winding down from the
/// previous session stops even though the new one is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Lifecycle {
    generation: u64,
    closed: bool,
}

impl Lifecycle {
    const fn stops(self, generation: u64) -> bool {
        self.closed || self.generation != generation
    }
}

/// Read-acknowledgement receiver and the generation of the loop holding it.
///
/// `holder` is meaningful only while `receiver` is out on a lease.
struct AckSlot {
    receiver: Option<mpsc::UnboundedReceiver<NotificationId>>,
    holder: u64,
}

/// Exclusive use of the acknowledgement receiver by one `run` call.
///
/// Dropping the lease hands the receiver back and wakes any `run` waiting
/// for it, including when the owning future is cancelled mid-flight. A
/// lease dropped before [`AckLease::finish`] also withdraws the loop's
/// status for its generation.
struct AckLease<'a> {
    channel: &'a NotificationChannel,
    generation: u64,
    receiver: Option<mpsc::UnboundedReceiver<NotificationId>>,
    finished: bool,
}

impl AckLease<'_> {
    async fn recv(&mut self) -> Option<NotificationId> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.recv().await,
            None => std::future::pending().await,
        }
    }

    fn try_recv(&mut self) -> Option<NotificationId> {
        self.receiver.as_mut()?.try_recv().ok()
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

impl Drop for AckLease<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!("notification loop cancelled");
            self.channel.set_status(
                self.generation,
                ChannelStatus::Disconnected {
                    reason: DisconnectReason::NotStarted,
                },
            );
        }
        if let Some(receiver) = self.receiver.take() {
            self.channel.lock_acks().receiver = Some(receiver);
        }
        self.channel.acks_returned.notify_waiters();
    }
}

/// Notification feed plus the connection that fills it.
pub struct NotificationChannel {
    transport: Arc<dyn NotificationTransport>,
    sleeper: Arc<dyn ReconnectSleeper>,
    jitter: Arc<dyn BackoffJitter>,
    clock: Arc<dyn Clock>,
    policy: ReconnectPolicy,
    feed: Mutex<NotificationFeed>,
    status: watch::Sender<ChannelStatus>,
    lifecycle: watch::Sender<Lifecycle>,
    ack_tx: mpsc::UnboundedSender<NotificationId>,
    ack_slot: Mutex<AckSlot>,
    acks_returned: Notify,
}

impl NotificationChannel {
    /// Build a channel using the default runtime helpers.
    pub fn new(transport: Arc<dyn NotificationTransport>, policy: ReconnectPolicy) -> Self {
        Self::with_runtime(transport, ChannelRuntime::default(), policy)
    }

    /// Build a channel with injected timing seams.
    pub fn with_runtime(
        transport: Arc<dyn NotificationTransport>,
        runtime: ChannelRuntime,
        policy: ReconnectPolicy,
    ) -> Self {
        let (status, _) = watch::channel(ChannelStatus::Disconnected {
            reason: DisconnectReason::NotStarted,
        });
        let (lifecycle, _) = watch::channel(Lifecycle {
            generation: 0,
            closed: false,
        });
        let (ack_tx, ack_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            sleeper: runtime.sleeper,
            jitter: runtime.jitter,
            clock: runtime.clock,
            policy,
            feed: Mutex::new(NotificationFeed::default()),
            status,
            lifecycle,
            ack_tx,
            ack_slot: Mutex::new(AckSlot {
                receiver: Some(ack_rx),
                holder: 0,
            }),
            acks_returned: Notify::new(),
        }
    }

    /// Connect and keep the feed filled until closed or out of retries.
    ///
    /// Returns at once for sessions whose role does not receive
    /// notifications; the channel then stays disconnected. Transport failures
    /// are logged and retried, never returned.
    pub async fn run(&self, session: &StoredSession) -> ChannelOutcome {
        let generation = self.lifecycle.borrow().generation;
        let Some(role) = session
            .user
            .role()
            .role()
            .filter(|role| role.receives_notifications())
        else {
            debug!(role = ?session.user.role(), "role does not receive notifications");
            self.set_status(
                generation,
                ChannelStatus::Disconnected {
                    reason: DisconnectReason::Ineligible,
                },
            );
            return ChannelOutcome::Ineligible;
        };

        let mut acks = match self.lease_acks(generation).await {
            Ok(lease) => lease,
            Err(outcome) => return outcome,
        };

        info!(%role, "opening notification channel");
        let outcome = self
            .connect_loop(generation, &session.token, &mut acks)
            .await;
        acks.finish();
        outcome
    }

    /// Take the acknowledgement receiver for `generation`.
    ///
    /// A loop of the same, still-open generation keeps it and this call
    /// reports `AlreadyRunning`. A loop that has been closed or superseded
    /// is waited for until its lease is dropped.
    async fn lease_acks(&self, generation: u64) -> Result<AckLease<'_>, ChannelOutcome> {
        let mut lifecycle = self.lifecycle.subscribe();
        loop {
            let handed_back = self.acks_returned.notified();
            tokio::pin!(handed_back);
            handed_back.as_mut().enable();

            {
                let mut slot = self.lock_acks();
                if let Some(receiver) = slot.receiver.take() {
                    slot.holder = generation;
                    return Ok(AckLease {
                        channel: self,
                        generation,
                        receiver: Some(receiver),
                        finished: false,
                    });
                }
                if !self.lifecycle.borrow().stops(slot.holder) {
                    warn!("notification channel is already running");
                    return Err(ChannelOutcome::AlreadyRunning);
                }
            }

            debug!("waiting for the previous notification loop to stop");
            tokio::select! {
                biased;
                _ = lifecycle.wait_for(|state| state.stops(generation)) => {
                    return Err(ChannelOutcome::TornDown);
                }
                () = handed_back => {}
            }
        }
    }

    async fn connect_loop(
        &self,
        generation: u64,
        token: &AccessToken,
        acks: &mut AckLease<'_>,
    ) -> ChannelOutcome {
        let mut shutdown = self.lifecycle.subscribe();
        let mut failures: u32 = 0;
        self.set_status(generation, ChannelStatus::Connecting);

        loop {
            let connected = tokio::select! {
                biased;
                _ = shutdown.wait_for(|state| state.stops(generation)) => {
                    return ChannelOutcome::TornDown;
                }
                result = self.transport.connect(token) => result,
            };

            match connected {
                Ok(mut connection) => {
                    failures = 0;
                    self.discard_stale_acks(acks);
                    self.set_status(generation, ChannelStatus::Connected);
                    info!("notification channel connected");

                    let pumped = self
                        .pump(generation, connection.as_mut(), &mut shutdown, acks)
                        .await;
                    connection.close().await;
                    match pumped {
                        Pump::Shutdown => return ChannelOutcome::TornDown,
                        Pump::Dropped(reason) => {
                            warn!(reason = %reason, "notification channel dropped");
                        }
                    }
                }
                Err(error) => {
                    warn!(
                        error = %error,
                        attempt = failures,
                        "notification channel connect failed"
                    );
                }
            }

            failures = failures.saturating_add(1);
            if failures > self.policy.max_attempts {
                warn!(
                    attempts = self.policy.max_attempts,
                    "notification channel giving up; feed stays available offline"
                );
                self.set_status(
                    generation,
                    ChannelStatus::Disconnected {
                        reason: DisconnectReason::RetriesExhausted,
                    },
                );
                return ChannelOutcome::RetriesExhausted;
            }

            self.set_status(generation, ChannelStatus::Reconnecting { attempt: failures });
            let delay = self.reconnect_delay(failures);
            debug!(attempt = failures, ?delay, "scheduling reconnect");
            let interrupted = tokio::select! {
                biased;
                _ = shutdown.wait_for(|state| state.stops(generation)) => true,
                () = self.sleeper.sleep(delay) => false,
            };
            if interrupted {
                return ChannelOutcome::TornDown;
            }
        }
    }

    async fn pump(
        &self,
        generation: u64,
        connection: &mut dyn NotificationConnection,
        shutdown: &mut watch::Receiver<Lifecycle>,
        acks: &mut AckLease<'_>,
    ) -> Pump {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait_for(|state| state.stops(generation)) => return Pump::Shutdown,
                Some(id) = acks.recv() => {
                    if let Err(error) = connection.acknowledge_read(&id).await {
                        warn!(error = %error, id = %id, "read acknowledgement not delivered");
                    }
                }
                event = connection.next_notification() => match event {
                    Ok(Some(notification)) => self.receive(notification),
                    Ok(None) => return Pump::Dropped("server closed the connection".to_owned()),
                    Err(error) => return Pump::Dropped(error.to_string()),
                },
            }
        }
    }

    fn receive(&self, notification: Notification) {
        let id = notification.id().clone();
        if self.lock_feed().push(notification) {
            debug!(id = %id, "notification received");
        } else {
            debug!(id = %id, "duplicate notification ignored");
        }
    }

    fn reconnect_delay(&self, attempt: u32) -> Duration {
        let base = self.policy.delay(attempt);
        let jittered = self.jitter.jittered_delay(base, attempt, self.clock.utc());
        self.policy.clamp(jittered)
    }

    fn discard_stale_acks(&self, acks: &mut AckLease<'_>) {
        while let Some(id) = acks.try_recv() {
            debug!(id = %id, "dropping read acknowledgement queued while disconnected");
        }
    }

    /// Close the connection and stop reconnecting.
    ///
    /// Idempotent. The feed is kept; call [`Self::clear_all`] when the
    /// session ends.
    pub fn close(&self) {
        self.lifecycle.send_modify(|state| state.closed = true);
        self.status.send_replace(ChannelStatus::Disconnected {
            reason: DisconnectReason::TornDown,
        });
    }

    /// Re-arm the channel for a new session, emptying the feed.
    ///
    /// A loop still running for the previous session stops at its next
    /// suspension point.
    pub fn reset(&self) {
        self.lock_feed().clear();
        self.lifecycle.send_modify(|state| {
            state.generation = state.generation.wrapping_add(1);
            state.closed = false;
        });
        self.status.send_replace(ChannelStatus::Disconnected {
            reason: DisconnectReason::NotStarted,
        });
    }

    /// Mark one notification read and tell the server, best effort.
    ///
    /// Returns whether the entry was unread. No acknowledgement is sent for
    /// unknown or already-read ids.
    pub fn mark_as_read(&self, id: &NotificationId) -> bool {
        let changed = self.lock_feed().mark_as_read(id);
        if changed {
            if self.status() == ChannelStatus::Connected {
                if self.ack_tx.send(id.clone()).is_err() {
                    debug!(id = %id, "acknowledgement queue closed");
                }
            } else {
                debug!(id = %id, "not connected; read acknowledgement dropped");
            }
        }
        changed
    }

    /// Mark every notification read. Local only.
    pub fn mark_all_as_read(&self) {
        self.lock_feed().mark_all_as_read();
    }

    /// Remove one notification, returning it if present.
    pub fn delete_notification(&self, id: &NotificationId) -> Option<Notification> {
        self.lock_feed().delete(id)
    }

    /// Empty the feed.
    pub fn clear_all(&self) {
        self.lock_feed().clear();
    }

    /// Feed snapshot, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.lock_feed().snapshot()
    }

    /// Number of unread notifications.
    pub fn unread_count(&self) -> usize {
        self.lock_feed().unread_count()
    }

    /// Current connection status.
    pub fn status(&self) -> ChannelStatus {
        *self.status.borrow()
    }

    /// Subscribe to status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<ChannelStatus> {
        self.status.subscribe()
    }

    fn set_status(&self, generation: u64, next: ChannelStatus) {
        let stale = self.lifecycle.borrow().stops(generation);
        self.status.send_if_modified(|status| {
            if stale || *status == next {
                return false;
            }
            *status = next;
            true
        });
    }

    fn lock_feed(&self) -> MutexGuard<'_, NotificationFeed> {
        self.feed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_acks(&self) -> MutexGuard<'_, AckSlot> {
        self.ack_slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
