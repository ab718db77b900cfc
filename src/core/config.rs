/*!
 * Runtime Configuration
 *
 * Settings consumed by the binary. Values come from defaults, a JSON file
 * (`ResourceConfig::load`) or `RESOURCE_*` environment variables
 * (`ResourceConfig::from_env`). Both sources are validated the same way.
 */

use super::errors::ResourceError;
use super::limits::{
    DEFAULT_BUFFER_SIZE, DEFAULT_EXTRA_SIZE, DEFAULT_MEMORY_POOL, DEFAULT_SHARED_TEXT_CAPACITY,
    DEFAULT_WORKER_COUNT, MAX_RESOURCE_BUFFER, MAX_WORKER_COUNT,
};
use super::types::ResourceResult;
use crate::fs::OpenMode;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const ENV_STORAGE_DIR: &str = "RESOURCE_STORAGE_DIR";
const ENV_BUFFER_SIZE: &str = "RESOURCE_BUFFER_SIZE";
const ENV_EXTRA_SIZE: &str = "RESOURCE_EXTRA_SIZE";
const ENV_SHARED_TEXT_CAPACITY: &str = "RESOURCE_SHARED_TEXT_CAPACITY";
const ENV_WORKER_COUNT: &str = "RESOURCE_WORKER_COUNT";
const ENV_MEMORY_CAPACITY: &str = "RESOURCE_MEMORY_CAPACITY";
const ENV_OPEN_MODE: &str = "RESOURCE_OPEN_MODE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceConfig {
    /// Directory holding the resources' write targets
    pub storage_dir: PathBuf,
    pub buffer_size: usize,
    pub extra_size: usize,
    pub shared_text_capacity: usize,
    pub worker_count: usize,
    /// Accounted memory pool in bytes
    pub memory_capacity: usize,
    pub open_mode: OpenMode,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            storage_dir: std::env::temp_dir().join("resource-kernel"),
            buffer_size: DEFAULT_BUFFER_SIZE,
            extra_size: DEFAULT_EXTRA_SIZE,
            shared_text_capacity: DEFAULT_SHARED_TEXT_CAPACITY,
            worker_count: DEFAULT_WORKER_COUNT,
            memory_capacity: DEFAULT_MEMORY_POOL,
            open_mode: OpenMode::default(),
        }
    }
}

impl ResourceConfig {
    /// Defaults overridden by any `RESOURCE_*` variables that are set
    pub fn from_env() -> ResourceResult<Self> {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var(ENV_STORAGE_DIR) {
            config.storage_dir = PathBuf::from(dir);
        }
        if let Some(v) = env_parse(ENV_BUFFER_SIZE)? {
            config.buffer_size = v;
        }
        if let Some(v) = env_parse(ENV_EXTRA_SIZE)? {
            config.extra_size = v;
        }
        if let Some(v) = env_parse(ENV_SHARED_TEXT_CAPACITY)? {
            config.shared_text_capacity = v;
        }
        if let Some(v) = env_parse(ENV_WORKER_COUNT)? {
            config.worker_count = v;
        }
        if let Some(v) = env_parse(ENV_MEMORY_CAPACITY)? {
            config.memory_capacity = v;
        }
        if let Ok(mode) = std::env::var(ENV_OPEN_MODE) {
            config.open_mode = match mode.to_ascii_lowercase().as_str() {
                "truncate" => OpenMode::Truncate,
                "append" => OpenMode::Append,
                other => {
                    return Err(ResourceError::Configuration(format!(
                        "{} must be 'truncate' or 'append', got '{}'",
                        ENV_OPEN_MODE, other
                    )))
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> ResourceResult<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .map_err(|e| ResourceError::io(format!("open config {}", path.display()), e))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ResourceError::io(format!("read config {}", path.display()), e))?;

        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            ResourceError::Configuration(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ResourceResult<()> {
        if self.buffer_size == 0 || self.buffer_size > MAX_RESOURCE_BUFFER {
            return Err(ResourceError::Configuration(format!(
                "buffer_size must be in 1..={}, got {}",
                MAX_RESOURCE_BUFFER, self.buffer_size
            )));
        }
        if self.extra_size == 0 || self.extra_size > MAX_RESOURCE_BUFFER {
            return Err(ResourceError::Configuration(format!(
                "extra_size must be in 1..={}, got {}",
                MAX_RESOURCE_BUFFER, self.extra_size
            )));
        }
        if self.worker_count > MAX_WORKER_COUNT {
            return Err(ResourceError::Configuration(format!(
                "worker_count must be at most {}, got {}",
                MAX_WORKER_COUNT, self.worker_count
            )));
        }
        if self.memory_capacity < self.buffer_size.saturating_add(self.extra_size) {
            return Err(ResourceError::Configuration(format!(
                "memory_capacity {} cannot hold one extended resource ({} + {} bytes)",
                self.memory_capacity, self.buffer_size, self.extra_size
            )));
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str) -> ResourceResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ResourceError::Configuration(format!("{}='{}': {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}
