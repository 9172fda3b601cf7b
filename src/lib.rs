//! Fast charging toggle for Android settings.
//!
//! One kernel control node holds the truth. Three actors drive it through a
//! shared [`Controller`]: the boot hook ([`BootRestorer`]), the settings
//! screen ([`PreferenceSurface`]) and the quick-settings tile
//! ([`TileSurface`]). Surfaces learn about each other's writes over an
//! [`EventBus`] and ignore the echo of their own.

pub mod boot;
pub mod bus;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod prefs;
pub mod surface;
pub mod sysfs;

pub use boot::{BootOutcome, BootPolicy, BootRestorer};
pub use bus::{Broadcast, EventBus, LocalBus, SessionId, SessionPhase, StateEvent, Subscription};
pub use config::Config;
pub use controller::{Capabilities, Controller};
pub use error::{ConfigError, PrefsError};
pub use prefs::{JsonPrefs, MemoryPrefs, PrefsStore};
pub use surface::{PreferenceSurface, SwitchPreference, TileState, TileSurface};
pub use sysfs::{NodeIo, Sysfs};
