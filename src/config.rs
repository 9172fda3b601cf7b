use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use crate::error::{ConfigError, ConfigResult};

// Preference / broadcast names
pub const FASTCHARGE_KEY: &str = "fast_charging";
pub const ACTION_FAST_CHARGE_SERVICE_CHANGED: &str =
    "com.android.fastcharge.battery.FAST_CHARGE_SERVICE_CHANGED";
pub const EXTRA_FAST_CHARGE_STATE: &str = "fastchargingenabled";

// User-facing strings
pub const TITLE_FAST_CHARGING: &str = "Fast charging";
pub const SUMMARY_NOT_SUPPORTED: &str = "Fast charging is not supported on this device";

// Default host locations
pub const RESOURCE_PATH: &str = "/system_ext/etc/fastcharge/config.json";
pub const PREFS_PATH: &str = "/data/user_de/0/com.android.fastcharge/shared_prefs/prefs.json";

/// On-disk shape of the platform resource that names the control node.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigResource {
    #[serde(rename = "config_FastChargePath", default)]
    pub fast_charge_path: String,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Resolved configuration. Built once at startup and shared read-only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    node_path: PathBuf,
}

impl Config {
    pub fn new(node_path: impl Into<PathBuf>) -> Self {
        Self { node_path: node_path.into() }
    }

    /// Load the control-node path from a JSON resource document.
    pub fn load(resource: &Path) -> ConfigResult<Self> {
        let raw = fs::read_to_string(resource).map_err(|source| ConfigError::Read {
            path: resource.to_path_buf(),
            source,
        })?;
        let res: ConfigResource =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: resource.to_path_buf(),
                source,
            })?;
        Self::from_resource(&res)
    }

    pub fn from_resource(res: &ConfigResource) -> ConfigResult<Self> {
        let path = res.fast_charge_path.trim();
        if path.is_empty() {
            return Err(ConfigError::MissingNodePath);
        }
        Ok(Self::new(path))
    }

    pub fn node_path(&self) -> &Path {
        &self.node_path
    }

    pub fn pref_key(&self) -> &'static str {
        FASTCHARGE_KEY
    }

    pub fn action(&self) -> &'static str {
        ACTION_FAST_CHARGE_SERVICE_CHANGED
    }

    pub fn extra_state(&self) -> &'static str {
        EXTRA_FAST_CHARGE_STATE
    }
}
