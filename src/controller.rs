//! Write-then-publish core shared by every surface.
//!
//! The control node is the only source of truth. Persisted desire is only
//! ever updated from the value read back after a write, and every broadcast
//! carries that read-back value.

use std::{path::Path, sync::Arc};

use log::{debug, info, warn};

use crate::{
    bus::{EventBus, StateEvent, Subscription},
    config::Config,
    prefs::PrefsStore,
    sysfs::NodeIo,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Node exists and is readable.
    pub supported: bool,
    pub writable: bool,
}

fn node_value(enabled: bool) -> &'static str {
    if enabled {
        "1"
    } else {
        "0"
    }
}

pub struct Controller {
    config: Arc<Config>,
    node: Arc<dyn NodeIo>,
    prefs: Arc<dyn PrefsStore>,
    bus: Arc<dyn EventBus>,
}

impl Controller {
    pub fn new(
        config: Arc<Config>,
        node: Arc<dyn NodeIo>,
        prefs: Arc<dyn PrefsStore>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self { config, node, prefs, bus }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn path(&self) -> &Path {
        self.config.node_path()
    }

    pub fn capabilities(&self) -> Capabilities {
        let path = self.path();
        Capabilities {
            supported: self.node.exists(path) && self.node.readable(path),
            writable: self.node.writable(path),
        }
    }

    /// Current state of the node. Absent, unreadable or `"0"` reads as off.
    pub fn read_truth(&self) -> bool {
        self.node.read_bool(self.path(), false)
    }

    /// Last persisted desire; off when never set.
    pub fn desired(&self) -> bool {
        self.prefs.get_bool(self.config.pref_key(), false)
    }

    /// Register a new session for state-change broadcasts.
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe(self.config.action())
    }

    /// Raw write of `enabled` to the node. No read-back, no persistence,
    /// no broadcast.
    pub fn write_node(&self, enabled: bool) -> bool {
        self.node.write_line(self.path(), node_value(enabled))
    }

    /// Publish `event` to every subscriber. Returns the delivery count.
    pub fn publish(&self, event: StateEvent) -> usize {
        self.bus.publish(event.to_broadcast())
    }

    /// Drive the node to `desired` on behalf of `session`.
    ///
    /// Returns the state read back after the write. On a node that is missing
    /// or unreadable this is `false` and nothing is touched; on a failed write
    /// the current state is returned and neither persistence nor subscribers
    /// are touched.
    pub fn request_set(&self, desired: bool, session: &mut Subscription) -> bool {
        let path = self.path();
        if !self.capabilities().supported {
            debug!("CTRL: {} unsupported, ignoring request from {}", path.display(), session.id());
            return false;
        }

        if !self.node.write_line(path, node_value(desired)) {
            warn!("CTRL: write {} to {} failed", node_value(desired), path.display());
            return self.read_truth();
        }

        let truth = self.read_truth();
        if truth != desired {
            warn!(
                "CTRL: node kept {} after writing {}",
                node_value(truth),
                node_value(desired)
            );
        }

        if let Err(e) = self.prefs.put_bool(self.config.pref_key(), truth) {
            warn!("CTRL: persisting {}={} failed ({})", self.config.pref_key(), truth, e);
        }

        session.arm_echo_latch();
        let delivered = self.publish(StateEvent::new(truth, session.id()));
        info!(
            "CTRL: fast charging {} by {} ({} subscribers)",
            if truth { "ON" } else { "OFF" },
            session.id(),
            delivered
        );
        truth
    }

    /// Decide whether `session` should re-display for `event`.
    ///
    /// While the session awaits its own echo, that echo is swallowed and the
    /// latch cleared. Events from other sessions are always applied and leave
    /// the latch armed. Events without an origin cannot be told apart, so an
    /// armed latch consumes the first one.
    pub fn on_external_state_event(
        &self,
        event: StateEvent,
        session: &mut Subscription,
    ) -> Option<bool> {
        if !session.awaiting_echo() {
            return Some(event.enabled);
        }

        match event.origin {
            Some(origin) if origin != session.id() => Some(event.enabled),
            _ => {
                session.clear_echo_latch();
                debug!("CTRL: {} dropped own echo", session.id());
                None
            }
        }
    }
}
