use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{CoreError, Result};

/// Version written into every persisted envelope
pub const SCHEMA_VERSION: u32 = 1;

/// Logical keys of the persisted layout
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Settings,
    TraitsOverride,
    TraitValue(String),
    Notes,
    Relationships(String),
}

impl StoreKey {
    pub fn as_key(&self) -> String {
        match self {
            StoreKey::Settings => "settings".to_string(),
            StoreKey::TraitsOverride => "traits-override".to_string(),
            StoreKey::TraitValue(trait_id) => format!("trait-value:{}", trait_id),
            StoreKey::Notes => "notes".to_string(),
            StoreKey::Relationships(character_id) => format!("relationships:{}", character_id),
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
    value: T,
}

/// Key-value persistence with typed access and schema versioning.
///
/// Backends only move raw JSON values around; the provided `get`/`set`
/// methods wrap every value in a `{version, value}` envelope.
pub trait ValueStore {
    fn read(&self, key: &str) -> Option<Value>;
    fn write(&mut self, key: &str, value: Value) -> Result<()>;
    /// Returns whether the key existed
    fn delete(&mut self, key: &str) -> Result<bool>;
    fn keys(&self) -> Vec<String>;

    fn get<T: DeserializeOwned>(&self, key: &StoreKey) -> Result<Option<T>> {
        let raw_key = key.as_key();
        let raw = match self.read(&raw_key) {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let envelope: Envelope<Value> = serde_json::from_value(raw)
            .map_err(|e| CoreError::Parse(format!("{}: {}", raw_key, e)))?;

        if envelope.version > SCHEMA_VERSION {
            return Err(CoreError::UnsupportedVersion {
                key: raw_key,
                found: envelope.version,
                supported: SCHEMA_VERSION,
            });
        }

        let value = serde_json::from_value(envelope.value)
            .map_err(|e| CoreError::Parse(format!("{}: {}", raw_key, e)))?;
        Ok(Some(value))
    }

    /// Like `get`, but a corrupt entry is logged and treated as absent
    fn load<T: DeserializeOwned>(&self, key: &StoreKey) -> Option<T> {
        match self.get(key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Ignoring stored entry {}: {}", key, e);
                None
            }
        }
    }

    fn set<T: Serialize + ?Sized>(&mut self, key: &StoreKey, value: &T) -> Result<()> {
        let envelope = Envelope {
            version: SCHEMA_VERSION,
            saved_at: Some(Utc::now()),
            value,
        };
        let raw = serde_json::to_value(&envelope)?;
        self.write(&key.as_key(), raw)
    }

    fn remove(&mut self, key: &StoreKey) -> Result<bool> {
        self.delete(&key.as_key())
    }

    fn clear(&mut self) -> Result<()> {
        for key in self.keys() {
            self.delete(&key)?;
        }
        Ok(())
    }
}

/// In-process store, insertion ordered
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: IndexMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ValueStore for MemoryStore {
    fn read(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        Ok(self.entries.shift_remove(key).is_some())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Store backed by a single pretty-printed JSON file, rewritten on every mutation
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: IndexMap<String, Value>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let entries = Self::load_entries(&path)?;
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_entries(path: &Path) -> Result<IndexMap<String, Value>> {
        if !path.exists() {
            return Ok(IndexMap::new());
        }

        let content = fs::read(path)?;
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(IndexMap::new());
        }

        match serde_json::from_slice(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                let backup = Self::set_aside(path)?;
                log::warn!(
                    "Store file {} is corrupt, moved to {} and starting empty: {}",
                    path.display(),
                    backup.display(),
                    e
                );
                Ok(IndexMap::new())
            }
        }
    }

    /// Rename an unreadable store file to `<name>.corrupt-<timestamp>`
    fn set_aside(path: &Path) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%d%H%M%S%3f");
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".corrupt-{}", stamp));
        let backup = path.with_file_name(name);
        fs::rename(path, &backup)?;
        Ok(backup)
    }

    fn persist(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl ValueStore for JsonFileStore {
    fn read(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        let existed = self.entries.shift_remove(key).is_some();
        if existed {
            self.persist()?;
        }
        Ok(existed)
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_layout() {
        assert_eq!(StoreKey::Settings.as_key(), "settings");
        assert_eq!(StoreKey::TraitsOverride.as_key(), "traits-override");
        assert_eq!(StoreKey::TraitValue("gore-level".into()).as_key(), "trait-value:gore-level");
        assert_eq!(StoreKey::Notes.as_key(), "notes");
        assert_eq!(StoreKey::Relationships("42".into()).as_key(), "relationships:42");
    }

    #[test]
    fn test_set_and_get() {
        let mut store = MemoryStore::new();
        store.set(&StoreKey::Notes, "keep it short").unwrap();

        let notes: Option<String> = store.get(&StoreKey::Notes).unwrap();
        assert_eq!(notes.as_deref(), Some("keep it short"));

        let raw = store.read("notes").unwrap();
        assert_eq!(raw["version"], json!(SCHEMA_VERSION));
    }

    #[test]
    fn test_missing_key() {
        let store = MemoryStore::new();
        let notes: Option<String> = store.get(&StoreKey::Notes).unwrap();
        assert!(notes.is_none());
    }

    #[test]
    fn test_bare_value_is_parse_error() {
        let mut store = MemoryStore::new();
        store.write("notes", json!("not wrapped")).unwrap();

        let result: Result<Option<String>> = store.get(&StoreKey::Notes);
        assert!(matches!(result, Err(CoreError::Parse(_))));

        let lenient: Option<String> = store.load(&StoreKey::Notes);
        assert!(lenient.is_none());
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut store = MemoryStore::new();
        store
            .write("notes", json!({ "version": SCHEMA_VERSION + 1, "value": "from the future" }))
            .unwrap();

        let result: Result<Option<String>> = store.get(&StoreKey::Notes);
        assert!(matches!(result, Err(CoreError::UnsupportedVersion { .. })));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut store = MemoryStore::new();
        store.set(&StoreKey::Notes, "a").unwrap();
        store.set(&StoreKey::TraitValue("x".into()), &10).unwrap();

        assert!(store.remove(&StoreKey::Notes).unwrap());
        assert!(!store.remove(&StoreKey::Notes).unwrap());
        assert_eq!(store.keys(), vec!["trait-value:x".to_string()]);

        store.clear().unwrap();
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        {
            let mut store = JsonFileStore::open(&path).unwrap();
            store.set(&StoreKey::TraitValue("gore-level".into()), &12).unwrap();
            store.set(&StoreKey::Notes, "sky is always green").unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        let value: Option<i64> = store.get(&StoreKey::TraitValue("gore-level".into())).unwrap();
        assert_eq!(value, Some(12));
        assert_eq!(
            store.keys(),
            vec!["trait-value:gore-level".to_string(), "notes".to_string()]
        );
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ this is not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_corrupt_file_kept_after_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let damaged = r#"{"relationships:hero": {"version": 1, "value": {"mara": {"name": "Mara""#;
        fs::write(&path, damaged).unwrap();

        let mut store = JsonFileStore::open(&path).unwrap();
        store.set(&StoreKey::Notes, "x").unwrap();

        let backups: Vec<PathBuf> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with("store.json.corrupt-"))
            })
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), damaged);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.keys(), vec!["notes".to_string()]);
    }
}
