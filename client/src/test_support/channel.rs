//! Shared test doubles for notification channel tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::ports::{
    NotificationConnection, NotificationTransport, NotificationTransportError,
};
use crate::domain::{
    AccessToken, BackoffJitter, ChannelRuntime, Notification, NotificationId, ReconnectSleeper,
};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("{name} mutex"),
    }
}

pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => panic!("failed to convert {delta:?} to TimeDelta: {error}"),
        };
        *lock(&self.0, "clock") += delta;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0, "clock")
    }
}

/// Sleeper that returns at once and remembers every requested delay.
#[derive(Default)]
pub struct RecordingSleeper(pub Mutex<Vec<Duration>>);

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        lock(&self.0, "sleeper").clone()
    }
}

#[async_trait]
impl ReconnectSleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        lock(&self.0, "sleeper").push(duration);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl BackoffJitter for NoJitter {
    fn jittered_delay(&self, base: Duration, _attempt: u32, _now: DateTime<Utc>) -> Duration {
        base
    }
}

/// Deterministic runtime: no jitter, recorded sleeps, fixed clock.
pub fn recording_runtime(sleeper: Arc<RecordingSleeper>) -> ChannelRuntime {
    let now = match DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z") {
        Ok(now) => now.to_utc(),
        Err(error) => panic!("fixture clock is invalid: {error}"),
    };
    ChannelRuntime {
        sleeper,
        jitter: Arc::new(NoJitter),
        clock: Arc::new(MutableClock::new(now)),
    }
}

/// One step of a scripted connection.
#[derive(Debug, Clone)]
pub enum ScriptedEvent {
    /// Deliver a notification.
    Deliver(Notification),
    /// Fail with a transport error.
    Drop,
    /// Report a clean server-side close.
    ServerClose,
}

/// Outcome of one scripted `connect` call.
#[derive(Debug, Clone)]
pub enum ConnectScript {
    /// Refuse the handshake.
    Refuse,
    /// Accept and replay the events, then stay idle until closed.
    Accept(Vec<ScriptedEvent>),
}

#[derive(Default)]
struct TransportLog {
    tokens: Vec<String>,
    acks: Vec<NotificationId>,
    closes: usize,
}

/// Transport that plays back a script; refuses once the script runs out.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<ConnectScript>>,
    log: Arc<Mutex<TransportLog>>,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = ConnectScript>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            log: Arc::default(),
        }
    }

    /// Number of `connect` calls seen.
    pub fn connect_calls(&self) -> usize {
        lock(&self.log, "transport log").tokens.len()
    }

    /// Tokens presented at each handshake.
    pub fn tokens(&self) -> Vec<String> {
        lock(&self.log, "transport log").tokens.clone()
    }

    /// Read acknowledgements delivered to any connection.
    pub fn acks(&self) -> Vec<NotificationId> {
        lock(&self.log, "transport log").acks.clone()
    }

    /// Number of connections closed by the channel.
    pub fn closes(&self) -> usize {
        lock(&self.log, "transport log").closes
    }
}

#[async_trait(?Send)]
impl NotificationTransport for ScriptedTransport {
    async fn connect(
        &self,
        token: &AccessToken,
    ) -> Result<Box<dyn NotificationConnection>, NotificationTransportError> {
        lock(&self.log, "transport log")
            .tokens
            .push(token.expose().to_owned());
        let next = lock(&self.script, "transport script").pop_front();
        match next {
            Some(ConnectScript::Accept(events)) => Ok(Box::new(ScriptedConnection {
                events: events.into(),
                log: Arc::clone(&self.log),
            })),
            Some(ConnectScript::Refuse) | None => {
                Err(NotificationTransportError::handshake("scripted refusal"))
            }
        }
    }
}

struct ScriptedConnection {
    events: VecDeque<ScriptedEvent>,
    log: Arc<Mutex<TransportLog>>,
}

#[async_trait(?Send)]
impl NotificationConnection for ScriptedConnection {
    async fn next_notification(
        &mut self,
    ) -> Result<Option<Notification>, NotificationTransportError> {
        match self.events.pop_front() {
            Some(ScriptedEvent::Deliver(notification)) => Ok(Some(notification)),
            Some(ScriptedEvent::Drop) => {
                Err(NotificationTransportError::transport("scripted drop"))
            }
            Some(ScriptedEvent::ServerClose) => Ok(None),
            None => std::future::pending().await,
        }
    }

    async fn acknowledge_read(
        &mut self,
        id: &NotificationId,
    ) -> Result<(), NotificationTransportError> {
        lock(&self.log, "transport log").acks.push(id.clone());
        Ok(())
    }

    async fn close(&mut self) {
        lock(&self.log, "transport log").closes += 1;
    }
}
