//! State-change broadcasts between the surfaces that display the toggle.
//!
//! A [`Subscription`] is the per-surface session: it owns the delivery queue
//! and the self-echo latch, so the latch lives exactly as long as the
//! registration does. Dropping it unregisters from the bus and discards any
//! event still queued for it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc, Mutex, MutexGuard, Weak,
    },
};

use log::debug;

use crate::config::{ACTION_FAST_CHARGE_SERVICE_CHANGED, EXTRA_FAST_CHARGE_STATE};

/// Identifies the session that caused a broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateEvent {
    pub enabled: bool,
    /// Session that published the event; `None` for actors without one
    /// (boot hook, host adapters that cannot carry it).
    pub origin: Option<SessionId>,
}

impl StateEvent {
    pub fn new(enabled: bool, origin: SessionId) -> Self {
        Self { enabled, origin: Some(origin) }
    }

    pub fn anonymous(enabled: bool) -> Self {
        Self { enabled, origin: None }
    }

    pub fn to_broadcast(&self) -> Broadcast {
        let mut extras = BTreeMap::new();
        extras.insert(EXTRA_FAST_CHARGE_STATE.to_string(), Value::Bool(self.enabled));
        Broadcast {
            action: ACTION_FAST_CHARGE_SERVICE_CHANGED.to_string(),
            extras,
            registered_only: true,
            user: UserScope::Current,
            origin: self.origin,
        }
    }

    /// Decode a broadcast. Other actions are rejected; a missing or
    /// non-boolean state extra reads as disabled.
    pub fn from_broadcast(b: &Broadcast) -> Option<Self> {
        if b.action != ACTION_FAST_CHARGE_SERVICE_CHANGED {
            return None;
        }
        let enabled = b
            .extras
            .get(EXTRA_FAST_CHARGE_STATE)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Some(Self { enabled, origin: b.origin })
    }
}

/// Which user a broadcast is delivered to. State changes never leave the
/// user that made them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserScope {
    #[default]
    Current,
}

/// Wire form of a broadcast, as handed to a host broadcast mechanism.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Broadcast {
    pub action: String,
    #[serde(default)]
    pub extras: BTreeMap<String, Value>,
    /// Only dynamically registered receivers get it.
    #[serde(default)]
    pub registered_only: bool,
    pub user: UserScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<SessionId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    AwaitingEcho,
}

type Detach = Box<dyn FnOnce(SessionId) + Send>;

/// A live registration on an [`EventBus`].
pub struct Subscription {
    id: SessionId,
    action: String,
    rx: Receiver<Broadcast>,
    suppress_own_echo: bool,
    detach: Option<Detach>,
}

impl Subscription {
    /// Bus implementations hand out subscriptions through this; `detach`
    /// runs once when the subscription is dropped.
    pub fn new(
        id: SessionId,
        action: impl Into<String>,
        rx: Receiver<Broadcast>,
        detach: impl FnOnce(SessionId) + Send + 'static,
    ) -> Self {
        Self {
            id,
            action: action.into(),
            rx,
            suppress_own_echo: false,
            detach: Some(Box::new(detach)),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn phase(&self) -> SessionPhase {
        if self.suppress_own_echo {
            SessionPhase::AwaitingEcho
        } else {
            SessionPhase::Idle
        }
    }

    pub fn awaiting_echo(&self) -> bool {
        self.suppress_own_echo
    }

    pub(crate) fn arm_echo_latch(&mut self) {
        self.suppress_own_echo = true;
    }

    pub(crate) fn clear_echo_latch(&mut self) {
        self.suppress_own_echo = false;
    }

    /// Next queued event, if any. Undecodable broadcasts are skipped.
    pub fn try_next(&mut self) -> Option<StateEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(b) => match StateEvent::from_broadcast(&b) {
                    Some(evt) => return Some(evt),
                    None => debug!("BUS: {} skipped broadcast {}", self.id, b.action),
                },
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("action", &self.action)
            .field("phase", &self.phase())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach(self.id);
        }
    }
}

/// Pluggable broadcast mechanism.
pub trait EventBus: Send + Sync {
    /// Deliver to every matching subscriber. Returns how many received it.
    fn publish(&self, broadcast: Broadcast) -> usize;

    fn subscribe(&self, action: &str) -> Subscription;
}

struct Subscriber {
    id: SessionId,
    action: String,
    tx: Sender<Broadcast>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

fn lock(m: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// In-process bus. Every subscriber is a registered receiver of the current
/// user, so delivery is filtered by action only. Events reach each
/// subscriber in publication order.
#[derive(Clone, Default)]
pub struct LocalBus {
    inner: Arc<Mutex<Registry>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }
}

impl EventBus for LocalBus {
    fn publish(&self, broadcast: Broadcast) -> usize {
        let mut reg = lock(&self.inner);
        let mut delivered = 0;
        reg.subscribers.retain(|s| {
            if s.action != broadcast.action {
                return true;
            }
            match s.tx.send(broadcast.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        if delivered == 0 {
            debug!("BUS: {} published with no subscribers", broadcast.action);
        }
        delivered
    }

    fn subscribe(&self, action: &str) -> Subscription {
        let (tx, rx) = mpsc::channel();
        let id = {
            let mut reg = lock(&self.inner);
            reg.next_id += 1;
            let id = SessionId(reg.next_id);
            reg.subscribers.push(Subscriber { id, action: action.to_string(), tx });
            id
        };
        debug!("BUS: {} registered for {}", id, action);

        let weak: Weak<Mutex<Registry>> = Arc::downgrade(&self.inner);
        Subscription::new(id, action, rx, move |id| {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).subscribers.retain(|s| s.id != id);
                debug!("BUS: {} unregistered", id);
            }
        })
    }
}
