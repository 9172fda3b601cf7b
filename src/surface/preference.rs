use std::sync::Arc;

use log::{debug, info};

use crate::{
    bus::Subscription,
    config::{SUMMARY_NOT_SUPPORTED, TITLE_FAST_CHARGING},
    controller::Controller,
};

/// Display state of the switch inside the settings screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwitchPreference {
    pub key: &'static str,
    pub title: &'static str,
    pub summary: Option<&'static str>,
    pub enabled: bool,
    pub checked: bool,
}

/// Settings screen holding the fast charging switch.
pub struct PreferenceSurface {
    controller: Arc<Controller>,
    session: Option<Subscription>,
    switch: SwitchPreference,
    renders: u32,
}

impl PreferenceSurface {
    pub fn new(controller: Arc<Controller>) -> Self {
        let switch = SwitchPreference {
            key: controller.config().pref_key(),
            title: TITLE_FAST_CHARGING,
            summary: None,
            enabled: false,
            checked: false,
        };
        Self { controller, session: None, switch, renders: 0 }
    }

    pub fn switch(&self) -> &SwitchPreference {
        &self.switch
    }

    pub fn session(&self) -> Option<&Subscription> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// How many times the switch was set from outside user input.
    pub fn render_count(&self) -> u32 {
        self.renders
    }

    fn set_checked(&mut self, checked: bool) {
        self.switch.checked = checked;
        self.renders += 1;
    }

    pub fn activate(&mut self) {
        if self.session.is_none() {
            self.session = Some(self.controller.subscribe());
        }

        if self.controller.capabilities().supported {
            self.switch.enabled = true;
            self.switch.summary = None;
        } else {
            info!("PREF: control node unavailable");
            self.switch.enabled = false;
            self.switch.summary = Some(SUMMARY_NOT_SUPPORTED);
        }
        let truth = self.controller.read_truth();
        self.set_checked(truth);
    }

    /// Re-read the node when the screen regains focus, picking up writes
    /// made by other processes.
    pub fn resume(&mut self) {
        let truth = self.controller.read_truth();
        if truth != self.switch.checked {
            debug!("PREF: node drifted to {} while paused", truth);
        }
        self.set_checked(truth);
    }

    /// The user flipped the switch. Returns the state now displayed.
    pub fn on_user_toggle(&mut self, new_value: bool) -> bool {
        if !self.switch.enabled {
            return self.switch.checked;
        }
        // Anything already delivered predates this input.
        self.pump_events();
        let Some(session) = self.session.as_mut() else {
            return self.switch.checked;
        };
        let truth = self.controller.request_set(new_value, session);
        self.switch.checked = truth;
        truth
    }

    /// Deliver queued broadcasts. Returns how many were taken off the queue.
    pub fn pump_events(&mut self) -> usize {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };
        let switch = &mut self.switch;
        let renders = &mut self.renders;
        super::drain(&self.controller, session, |enabled| {
            switch.checked = enabled;
            *renders += 1;
        })
    }

    pub fn deactivate(&mut self) {
        if let Some(session) = self.session.take() {
            session.unsubscribe();
        }
    }
}
