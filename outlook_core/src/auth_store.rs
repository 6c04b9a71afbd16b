use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::token::TokenCache;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("persist error: {0}")]
    Persist(String),
}

/// Durable home of the serialized token blob, keyed by application (client) id.
pub trait TokenStore: Send + Sync {
    fn load(&self, key: &str) -> Option<TokenCache>;
    fn save(&self, key: &str, cache: &TokenCache) -> Result<(), StoreError>;
    fn clear(&self, key: &str) -> Result<(), StoreError>;
}

/// A simple in-memory store, mainly for testing.
#[derive(Default)]
pub struct MemoryTokenStore {
    map: std::sync::Mutex<HashMap<String, TokenCache>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self, key: &str) -> Option<TokenCache> {
        self.map.lock().ok()?.get(key).cloned()
    }

    fn save(&self, key: &str, cache: &TokenCache) -> Result<(), StoreError> {
        self.map
            .lock()
            .map_err(|e| StoreError::Persist(format!("lock poisoned: {}", e)))?
            .insert(key.to_string(), cache.clone());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        self.map
            .lock()
            .map_err(|e| StoreError::Persist(format!("lock poisoned: {}", e)))?
            .remove(key);
        Ok(())
    }
}

/// Default cache location: `~/.config/outlook_mcp/token_cache.json` (Unix)
/// or `%APPDATA%/outlook_mcp/token_cache.json` (Windows).
pub fn default_cache_path() -> PathBuf {
    let base = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("outlook_mcp").join("token_cache.json")
}

/// JSON file holding one token cache per client id.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> HashMap<String, TokenCache> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                tracing::warn!(path = %self.path.display(), "ignoring unreadable token cache: {}", e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }

    fn write_map(&self, map: &HashMap<String, TokenCache>) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| StoreError::Unavailable(format!("{}: {}", dir.display(), e)))?;
        }
        let s = serde_json::to_string_pretty(map)
            .map_err(|e| StoreError::Persist(format!("serde: {}", e)))?;
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        // Owner read/write only, from the moment the file exists
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&self.path)
            .map_err(|e| StoreError::Persist(format!("{}: {}", self.path.display(), e)))?;
        file.write_all(s.as_bytes())
            .map_err(|e| StoreError::Persist(e.to_string()))?;

        // mode() only applies on creation; tighten a pre-existing file too
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)
                .map_err(|e| StoreError::Persist(format!("chmod: {}", e)))?;
        }

        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, key: &str) -> Option<TokenCache> {
        self.read_map().remove(key)
    }

    fn save(&self, key: &str, cache: &TokenCache) -> Result<(), StoreError> {
        let mut map = self.read_map();
        map.insert(key.to_string(), cache.clone());
        self.write_map(&map)
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.read_map();
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}
