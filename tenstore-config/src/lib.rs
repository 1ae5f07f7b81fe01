// Settings management for tenstore
//
// Settings are held as one JSON tree. Sources are layered in the order they
// are loaded; later sources override earlier ones key by key.

pub mod env;
pub mod error;
pub mod loader;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Default environment variable prefix
pub const DEFAULT_ENV_PREFIX: &str = "TENSTORE";

/// Main settings manager
#[derive(Clone)]
pub struct ConfigManager {
    root: Arc<RwLock<Map<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Create an empty manager reading `TENSTORE_*` variables
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_ENV_PREFIX)
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            root: Arc::new(RwLock::new(Map::new())),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Load settings from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let vars = loader.load();
        debug!(count = vars.len(), "Loaded settings from environment");

        let mut root = self.root.write();
        for (path, value) in vars {
            insert_path(&mut root, &path, value);
        }
        Ok(())
    }

    /// Load a `.env` file into the process environment, then the environment
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        if let Some(path) = path {
            dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
        } else {
            dotenvy::dotenv().ok(); // Ignore if .env doesn't exist
        }
        self.load_env()
    }

    /// Load settings from a JSON, TOML or env-style file
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = ConfigLoader::auto(path)?.load_file(path)?;
        debug!(path = %path.display(), "Loaded settings file");
        self.merge_value(data);
        Ok(())
    }

    /// Load settings from a string in the given format
    pub fn load_str(&self, content: &str, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).parse(content)?;
        self.merge_value(data);
        Ok(())
    }

    /// Set a value at a dotted path
    pub fn set<T: Serialize>(&self, path: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value).map_err(|e| {
            ConfigError::DeserializationError {
                key: path.to_string(),
                message: e.to_string(),
            }
        })?;

        insert_path(&mut self.root.write(), path, json_value);
        Ok(())
    }

    /// Get a value at a dotted path
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self
            .raw(path)
            .ok_or_else(|| ConfigError::KeyNotFound(path.to_string()))?;

        serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError {
            key: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Get a value with default
    pub fn get_or<T: DeserializeOwned>(&self, path: &str, default: T) -> T {
        self.get(path).unwrap_or(default)
    }

    /// Deserialize a whole section; a missing section deserializes from `{}`
    /// so structs with `#[serde(default)]` fall back to their defaults.
    pub fn section<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.raw(path).unwrap_or_else(|| Value::Object(Map::new()));
        serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError {
            key: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Check if a path exists
    pub fn has(&self, path: &str) -> bool {
        self.raw(path).is_some()
    }

    /// Top-level keys
    pub fn keys(&self) -> Vec<String> {
        self.root.read().keys().cloned().collect()
    }

    /// Overlay another manager's settings onto this one
    pub fn merge(&self, other: &ConfigManager) {
        let other = Value::Object(other.root.read().clone());
        self.merge_value(other);
    }

    fn raw(&self, path: &str) -> Option<Value> {
        let root = self.root.read();
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = root.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current.clone())
    }

    fn merge_value(&self, value: Value) {
        if let Value::Object(map) = value {
            let mut root = self.root.write();
            deep_merge(&mut root, map);
        }
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert `value` at a dotted path, creating intermediate objects.
pub(crate) fn insert_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            root.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = root
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                insert_path(child, rest, value);
            }
        }
    }
}

fn deep_merge(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        match value {
            Value::Object(incoming) => {
                if let Some(Value::Object(existing)) = target.get_mut(&key) {
                    deep_merge(existing, incoming);
                    continue;
                }
                target.insert(key, Value::Object(incoming));
            }
            value => {
                target.insert(key, value);
            }
        }
    }
}
