use std::sync::Arc;

use log::debug;

use crate::{bus::Subscription, config::SUMMARY_NOT_SUPPORTED, controller::Controller};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileState {
    Unavailable,
    Inactive,
    Active,
}

impl TileState {
    fn from_truth(enabled: bool) -> Self {
        if enabled {
            TileState::Active
        } else {
            TileState::Inactive
        }
    }
}

/// Quick-settings tile: one tap-to-toggle button.
pub struct TileSurface {
    controller: Arc<Controller>,
    session: Option<Subscription>,
    state: TileState,
    renders: u32,
}

impl TileSurface {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self { controller, session: None, state: TileState::Unavailable, renders: 0 }
    }

    pub fn state(&self) -> TileState {
        self.state
    }

    pub fn subtitle(&self) -> Option<&'static str> {
        match self.state {
            TileState::Unavailable => Some(SUMMARY_NOT_SUPPORTED),
            _ => None,
        }
    }

    pub fn session(&self) -> Option<&Subscription> {
        self.session.as_ref()
    }

    pub fn is_listening(&self) -> bool {
        self.session.is_some()
    }

    /// How many times the tile re-rendered in response to a broadcast.
    pub fn render_count(&self) -> u32 {
        self.renders
    }

    fn render(&mut self) {
        self.state = if self.controller.capabilities().supported {
            TileState::from_truth(self.controller.read_truth())
        } else {
            TileState::Unavailable
        };
    }

    /// The tile became visible in the panel.
    pub fn start_listening(&mut self) {
        if self.session.is_none() {
            self.session = Some(self.controller.subscribe());
        }
        self.render();
    }

    pub fn click(&mut self) -> TileState {
        if self.state == TileState::Unavailable {
            return self.state;
        }
        self.pump_events();
        let Some(session) = self.session.as_mut() else {
            debug!("TILE: click while not listening");
            return self.state;
        };
        let desired = !self.controller.read_truth();
        let truth = self.controller.request_set(desired, session);
        self.state = TileState::from_truth(truth);
        self.state
    }

    /// Deliver queued broadcasts. Returns how many were taken off the queue.
    pub fn pump_events(&mut self) -> usize {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };
        let state = &mut self.state;
        let renders = &mut self.renders;
        super::drain(&self.controller, session, |enabled| {
            if *state != TileState::Unavailable {
                *state = TileState::from_truth(enabled);
                *renders += 1;
            }
        })
    }

    /// The tile left the panel.
    pub fn stop_listening(&mut self) {
        if let Some(session) = self.session.take() {
            session.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bus::{LocalBus, SessionPhase, StateEvent},
        config::Config,
        prefs::MemoryPrefs,
        sysfs::Sysfs,
    };
    use std::fs;
    use tempfile::tempdir;

    fn controller(node: &std::path::Path) -> Arc<Controller> {
        Arc::new(Controller::new(
            Arc::new(Config::new(node)),
            Arc::new(Sysfs),
            Arc::new(MemoryPrefs::new()),
            Arc::new(LocalBus::new()),
        ))
    }

    #[test]
    fn renders_node_state_when_shown() {
        let dir = tempdir().unwrap();
        let node = dir.path().join("fast_charge");
        fs::write(&node, "1").unwrap();

        let mut tile = TileSurface::new(controller(&node));
        assert!(!tile.is_listening());
        tile.start_listening();
        assert_eq!(tile.state(), TileState::Active);
        assert_eq!(tile.subtitle(), None);
    }

    #[test]
    fn click_toggles_and_swallows_own_echo() {
        let dir = tempdir().unwrap();
        let node = dir.path().join("fast_charge");
        fs::write(&node, "1").unwrap();

        let mut tile = TileSurface::new(controller(&node));
        tile.start_listening();

        assert_eq!(tile.click(), TileState::Inactive);
        assert_eq!(fs::read_to_string(&node).unwrap(), "0");
        assert_eq!(tile.pump_events(), 1);
        assert_eq!(tile.render_count(), 0);
        assert_eq!(tile.session().map(|s| s.phase()), Some(SessionPhase::Idle));
    }

    #[test]
    fn unsupported_tile_ignores_clicks() {
        let dir = tempdir().unwrap();
        let node = dir.path().join("absent");

        let mut tile = TileSurface::new(controller(&node));
        tile.start_listening();
        assert_eq!(tile.state(), TileState::Unavailable);
        assert_eq!(tile.subtitle(), Some(SUMMARY_NOT_SUPPORTED));
        assert_eq!(tile.click(), TileState::Unavailable);
        assert!(!node.exists());
    }

    #[test]
    fn unsupported_tile_does_not_rerender_on_broadcast() {
        let dir = tempdir().unwrap();
        let node = dir.path().join("absent");

        let ctrl = controller(&node);
        let mut tile = TileSurface::new(ctrl.clone());
        tile.start_listening();

        let other = ctrl.subscribe();
        ctrl.publish(StateEvent::new(true, other.id()));
        ctrl.publish(StateEvent::anonymous(false));

        assert_eq!(tile.pump_events(), 2);
        assert_eq!(tile.render_count(), 0);
        assert_eq!(tile.state(), TileState::Unavailable);
    }

    #[test]
    fn stop_listening_drops_pending_events() {
        let dir = tempdir().unwrap();
        let node = dir.path().join("fast_charge");
        fs::write(&node, "0").unwrap();

        let ctrl = controller(&node);
        let mut tile = TileSurface::new(ctrl.clone());
        tile.start_listening();

        let mut other = ctrl.subscribe();
        ctrl.request_set(true, &mut other);
        tile.stop_listening();
        assert_eq!(tile.pump_events(), 0);
        assert_eq!(tile.state(), TileState::Inactive);
    }
}
