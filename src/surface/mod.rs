//! View-models that bind a boolean display to the [`Controller`]. The host
//! event loop calls `pump_events` on each active surface to deliver queued
//! broadcasts.

mod preference;
mod tile;

pub use preference::{PreferenceSurface, SwitchPreference};
pub use tile::{TileState, TileSurface};

use crate::{bus::Subscription, controller::Controller};

/// Drain `session`, passing every event that should be displayed to `apply`.
/// Returns the number of events taken off the queue.
fn drain(controller: &Controller, session: &mut Subscription, mut apply: impl FnMut(bool)) -> usize {
    let mut seen = 0;
    while let Some(event) = session.try_next() {
        seen += 1;
        if let Some(enabled) = controller.on_external_state_event(event, session) {
            apply(enabled);
        }
    }
    seen
}
