use std::sync::Arc;

use log::{info, warn};

use crate::{bus::StateEvent, controller::Controller};

/// What the boot hook does after restoring the node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BootPolicy {
    /// Write the persisted desire and nothing else. No surface is listening
    /// this early.
    #[default]
    WriteOnly,
    /// Also read back and broadcast the result, for hosts that start
    /// surfaces before boot completion.
    WriteAndPublish,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BootOutcome {
    pub desired: bool,
    pub written: bool,
    /// Subscribers reached; always 0 under [`BootPolicy::WriteOnly`].
    pub delivered: usize,
}

/// One-shot actor run when the host signals boot completion.
pub struct BootRestorer {
    controller: Arc<Controller>,
    policy: BootPolicy,
}

impl BootRestorer {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self { controller, policy: BootPolicy::default() }
    }

    pub fn with_policy(mut self, policy: BootPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn on_boot_completed(&self) -> BootOutcome {
        let desired = self.controller.desired();
        let written = self.controller.write_node(desired);
        if written {
            info!("BOOT: restored fast charging {}", if desired { "ON" } else { "OFF" });
        } else {
            warn!("BOOT: could not restore fast charging (node unavailable)");
        }

        let delivered = match self.policy {
            BootPolicy::WriteAndPublish if written => {
                let truth = self.controller.read_truth();
                self.controller.publish(StateEvent::anonymous(truth))
            }
            _ => 0,
        };

        BootOutcome { desired, written, delivered }
    }
}
