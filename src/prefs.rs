use serde_json::Value;
use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use log::warn;

use crate::error::{PrefsError, PrefsResult};

/// Persistent per-user key -> boolean mapping that survives reboot.
pub trait PrefsStore: Send + Sync {
    fn get_bool(&self, key: &str, default: bool) -> bool;
    fn put_bool(&self, key: &str, value: bool) -> PrefsResult<()>;
}

type Map = BTreeMap<String, Value>;

fn lock(m: &Mutex<Map>) -> MutexGuard<'_, Map> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Preferences kept in a JSON object on disk. Non-boolean values written by
/// other components are preserved untouched.
#[derive(Debug)]
pub struct JsonPrefs {
    path: PathBuf,
    values: Mutex<Map>,
}

impl JsonPrefs {
    /// Open the store at `path`. A missing file is an empty store; a corrupt
    /// one is logged and treated as empty (the next write replaces it).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str::<Map>(&s) {
                Ok(m) => m,
                Err(e) => {
                    warn!("PREFS: failed to parse {}: {} (starting empty)", path.display(), e);
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        };
        Self { path, values: Mutex::new(values) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &Map) -> PrefsResult<()> {
        write_atomic(&self.path, values)
    }
}

fn write_atomic(path: &Path, values: &Map) -> PrefsResult<()> {
    let io_err = |source: io::Error| PrefsError::Io { path: path.to_path_buf(), source };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    let data = serde_json::to_string_pretty(values)?;
    fs::write(&tmp, data.as_bytes()).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

impl PrefsStore for JsonPrefs {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        lock(&self.values)
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    fn put_bool(&self, key: &str, value: bool) -> PrefsResult<()> {
        let mut values = lock(&self.values);
        let prev = values.insert(key.to_string(), Value::Bool(value));
        if let Err(e) = self.persist(&values) {
            // Keep memory consistent with what is on disk.
            match prev {
                Some(p) => values.insert(key.to_string(), p),
                None => values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}

/// Process-local store, used by hosts without persistent storage and by tests.
#[derive(Debug, Default)]
pub struct MemoryPrefs {
    values: Mutex<Map>,
}

impl MemoryPrefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bool(key: &str, value: bool) -> Self {
        let prefs = Self::new();
        lock(&prefs.values).insert(key.to_string(), Value::Bool(value));
        prefs
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.values).contains_key(key)
    }
}

impl PrefsStore for MemoryPrefs {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        lock(&self.values)
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    fn put_bool(&self, key: &str, value: bool) -> PrefsResult<()> {
        lock(&self.values).insert(key.to_string(), Value::Bool(value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn json_prefs_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared_prefs").join("prefs.json");

        let prefs = JsonPrefs::open(&path);
        assert!(!prefs.get_bool("fast_charging", false));
        prefs.put_bool("fast_charging", true).unwrap();

        let reopened = JsonPrefs::open(&path);
        assert!(reopened.get_bool("fast_charging", false));
        assert!(!Path::new(&format!("{}.tmp", path.display())).exists());
    }

    #[test]
    fn json_prefs_keep_foreign_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, r#"{ "theme": "dark", "fast_charging": false }"#).unwrap();

        let prefs = JsonPrefs::open(&path);
        prefs.put_bool("fast_charging", true).unwrap();

        let raw: Map = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.get("theme"), Some(&Value::String("dark".into())));
        assert_eq!(raw.get("fast_charging"), Some(&Value::Bool(true)));
    }

    #[test]
    fn corrupt_file_reads_as_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{ broken").unwrap();

        let prefs = JsonPrefs::open(&path);
        assert!(prefs.get_bool("fast_charging", true));
        assert!(!prefs.get_bool("fast_charging", false));
    }

    #[test]
    fn failed_persist_rolls_back_memory() {
        let dir = tempdir().unwrap();
        // A regular file where the parent directory should be.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let path = blocker.join("prefs.json");

        let mut seeded = Map::new();
        seeded.insert("fast_charging".into(), Value::Bool(true));
        let prefs = JsonPrefs { path: path.clone(), values: Mutex::new(seeded) };

        let err = prefs.put_bool("fast_charging", false).unwrap_err();
        assert!(matches!(err, PrefsError::Io { .. }));
        assert!(prefs.get_bool("fast_charging", false));

        assert!(prefs.put_bool("other", true).is_err());
        assert!(!lock(&prefs.values).contains_key("other"));
        assert!(!path.exists());
    }

    #[test]
    fn non_bool_value_reads_as_default() {
        let prefs = MemoryPrefs::new();
        lock(&prefs.values).insert("fast_charging".into(), Value::from(1));
        assert!(!prefs.get_bool("fast_charging", false));
        assert!(prefs.contains("fast_charging"));
    }
}
