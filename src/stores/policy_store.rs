use crate::core::error::StoreError;
use crate::models::policy::Policy;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

/// JSON-file backed policy store.
///
/// Every save replaces the whole document through a temp file and a rename,
/// so readers only ever see a complete previous or complete new policy.
/// Writers are serialized so concurrent read-modify-write updates from the
/// control surface cannot drop each other's edits.
pub struct PolicyStore {
    path: PathBuf,
    last_known_good: RwLock<Policy>,
    write_lock: Mutex<()>,
}

impl PolicyStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_known_good: RwLock::new(Policy::default()),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the policy file. A missing file yields the default policy.
    pub fn load(&self) -> Result<Policy, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Policy file absent, using defaults");
                return Ok(Policy::default());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let policy: Policy =
            serde_json::from_str(&content).map_err(|e| StoreError::CorruptConfig {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        self.remember(&policy);
        Ok(policy)
    }

    /// Load, or fall back to the last policy that parsed or saved successfully.
    pub fn load_or_last_known(&self) -> Policy {
        match self.load() {
            Ok(policy) => policy,
            Err(e) => {
                error!(error = %e, "Policy load failed, serving last known good policy");
                self.last_known_good()
            }
        }
    }

    pub fn last_known_good(&self) -> Policy {
        self.last_known_good
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn save(&self, policy: &Policy) -> Result<(), StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.write_atomic(policy)
    }

    /// Serialized read-modify-write. The closure sees the current policy
    /// (or the last known good one if the file is unreadable).
    pub fn update<F>(&self, f: F) -> Result<Policy, StoreError>
    where
        F: FnOnce(&mut Policy),
    {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut policy = self.load_or_last_known();
        f(&mut policy);
        self.write_atomic(&policy)?;
        Ok(policy)
    }

    /// Write `default` if no policy file exists yet. Returns whether a file was created.
    pub fn ensure_exists(&self, default: &Policy) -> Result<bool, StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if self.path.exists() {
            return Ok(false);
        }

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        self.write_atomic(default)?;
        info!(path = %self.path.display(), "Created default policy file");
        Ok(true)
    }

    fn write_atomic(&self, policy: &Policy) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let bytes = serde_json::to_vec_pretty(policy)
            .map_err(|e| io_err(std::io::Error::new(ErrorKind::InvalidData, e)))?;

        let tmp = self.temp_path();
        let mut file = File::create(&tmp).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(e));
        }

        self.remember(policy);
        debug!(
            path = %self.path.display(),
            enabled = policy.enabled,
            trackers = policy.trackers.len(),
            "Policy saved"
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn remember(&self, policy: &Policy) {
        *self
            .last_known_good
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = policy.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> PolicyStore {
        PolicyStore::new(dir.path().join("config.json"))
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load().unwrap(), Policy::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let policy = Policy::new(true, vec!["https://priv.example/announce".to_string()]);

        store.save(&policy).unwrap();

        assert_eq!(store.load().unwrap(), policy);
        assert!(!dir.path().join("config.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_reported_and_last_known_good_survives() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let policy = Policy::new(true, vec!["https://a/".to_string()]);
        store.save(&policy).unwrap();

        fs::write(store.path(), "{ \"enabled\": tru").unwrap();

        assert!(matches!(store.load(), Err(StoreError::CorruptConfig { .. })));
        assert_eq!(store.last_known_good(), policy);
        assert_eq!(store.load_or_last_known(), policy);
    }

    #[test]
    fn test_save_into_missing_directory_fails_with_io() {
        let dir = TempDir::new().unwrap();
        let store = PolicyStore::new(dir.path().join("missing").join("config.json"));
        let result = store.save(&Policy::new(true, vec![]));
        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert_eq!(store.last_known_good(), Policy::default());
    }

    #[test]
    fn test_ensure_exists_creates_directory_and_file_once() {
        let dir = TempDir::new().unwrap();
        let store = PolicyStore::new(dir.path().join("data").join("config.json"));
        let seeded = Policy::new(false, vec!["https://a/".to_string()]);

        assert!(store.ensure_exists(&seeded).unwrap());
        assert!(!store.ensure_exists(&Policy::default()).unwrap());
        assert_eq!(store.load().unwrap(), seeded);
    }

    #[test]
    fn test_update_applies_patch() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .save(&Policy::new(false, vec!["https://a/".to_string()]))
            .unwrap();

        let updated = store.update(|p| p.enabled = true).unwrap();

        assert!(updated.enabled);
        assert_eq!(updated.trackers, vec!["https://a/".to_string()]);
        assert_eq!(store.load().unwrap(), updated);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .update(|p| p.trackers.push(format!("https://t{i}/")))
                        .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.load().unwrap().trackers.len(), 8);
    }

    #[test]
    fn test_reads_during_writes_never_see_torn_documents() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));
        store.save(&Policy::new(true, vec![])).unwrap();

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..200 {
                    let trackers = (0..i).map(|n| format!("https://tracker{n}/")).collect();
                    store.save(&Policy::new(i % 2 == 0, trackers)).unwrap();
                }
            })
        };

        for _ in 0..200 {
            assert!(store.load().is_ok());
        }

        writer.join().unwrap();
    }
}
