//! Durable key/value storage for the persisted cart
//!
//! Modelled on browser local storage: string values under string keys, read
//! and written synchronously. The cart store only ever needs one key.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SelfServeError};

/// Key under which the cart blob is stored by default
pub const DEFAULT_CART_KEY: &str = "cart";

pub trait KeyValueStorage {
    /// Read a value. `Ok(None)` when the key has never been written.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&mut self, key: &str) -> Result<()>;
}

/// Returns true for keys safe to use as a file stem.
pub fn is_key_valid(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn ensure_valid_key(key: &str) -> Result<()> {
    if is_key_valid(key) {
        Ok(())
    } else {
        Err(SelfServeError::storage(format!("invalid storage key: {key:?}")))
    }
}

/// One JSON file per key inside a state directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// The directory is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn item_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        ensure_valid_key(key)?;
        let path = self.item_path(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        ensure_valid_key(key)?;
        fs::create_dir_all(&self.root)?;

        // Write-then-rename so a crash never leaves a half-written blob.
        let path = self.item_path(key);
        let tmp = self.root.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        ensure_valid_key(key)?;
        match fs::remove_file(self.item_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process storage; state lives as long as the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed storage with a raw value, e.g. a blob from an earlier session.
    pub fn with_item(mut self, key: &str, value: impl Into<String>) -> Self {
        self.items.insert(key.to_string(), value.into());
        self
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }
}

/// A backend that refuses every operation, like a browser with storage disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableStorage;

impl KeyValueStorage for UnavailableStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>> {
        Err(SelfServeError::storage("storage is unavailable"))
    }

    fn set_item(&mut self, _key: &str, _value: &str) -> Result<()> {
        Err(SelfServeError::storage("storage is unavailable"))
    }

    fn remove_item(&mut self, _key: &str) -> Result<()> {
        Err(SelfServeError::storage("storage is unavailable"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_key_validation() {
        assert!(is_key_valid("cart"));
        assert!(is_key_valid("cart_v2-test"));
        assert!(!is_key_valid(""));
        assert!(!is_key_valid("../cart"));
        assert!(!is_key_valid("a/b"));
    }

    #[test]
    fn test_file_storage_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("state"));
        assert_eq!(storage.get_item("cart").unwrap(), None);
    }

    #[test]
    fn test_file_storage_set_get_remove() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::new(dir.path().join("state"));

        storage.set_item("cart", "{\"a\":1}").unwrap();
        assert_eq!(storage.get_item("cart").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(dir.path().join("state/cart.json").exists());

        storage.set_item("cart", "{}").unwrap();
        assert_eq!(storage.get_item("cart").unwrap().as_deref(), Some("{}"));

        storage.remove_item("cart").unwrap();
        assert_eq!(storage.get_item("cart").unwrap(), None);
        // Removing twice is fine
        storage.remove_item("cart").unwrap();
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::new(dir.path());
        let err = storage.set_item("../escape", "x").unwrap_err();
        assert!(matches!(err, SelfServeError::Storage(_)));
    }

    #[test]
    fn test_memory_storage() {
        let mut storage = MemoryStorage::new().with_item("cart", "seed");
        assert_eq!(storage.get_item("cart").unwrap().as_deref(), Some("seed"));
        storage.set_item("cart", "next").unwrap();
        assert_eq!(storage.get_item("cart").unwrap().as_deref(), Some("next"));
        storage.remove_item("cart").unwrap();
        assert_eq!(storage.get_item("cart").unwrap(), None);
    }

    #[test]
    fn test_unavailable_storage_always_errors() {
        let mut storage = UnavailableStorage;
        assert!(storage.get_item("cart").is_err());
        assert!(storage.set_item("cart", "x").is_err());
        assert!(storage.remove_item("cart").is_err());
    }
}
