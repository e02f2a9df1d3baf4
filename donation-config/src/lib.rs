// Layered settings for the donation platform
//
// Every key remembers the layer that supplied it. A value only replaces
// another from the same or a lower layer, so precedence holds whatever order
// the sources are read in:
//
//   file < .env < DONATION_* environment < programmatic override

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::Settings;
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Prefix of the platform's environment variables
pub const ENV_PREFIX: &str = "DONATION";

/// Where a setting came from, lowest precedence first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    File,
    Dotenv,
    Environment,
    Override,
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    layer: Layer,
}

/// Flat, case-insensitive key space shared by every source.
#[derive(Clone)]
pub struct ConfigManager {
    entries: Arc<RwLock<BTreeMap<String, Entry>>>,
    env: EnvLoader,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::with_prefix(ENV_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
            env: EnvLoader::new(prefix),
        }
    }

    pub fn builder() -> ConfigManagerBuilder {
        ConfigManagerBuilder::default()
    }

    /// Apply `values` as `layer`; keys held by a higher layer are kept.
    pub fn merge<I>(&self, layer: Layer, values: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut entries = self.entries.write();
        for (key, value) in values {
            let key = key.to_lowercase();
            match entries.get(&key) {
                Some(existing) if existing.layer > layer => {}
                _ => {
                    entries.insert(key, Entry { value, layer });
                }
            }
        }
    }

    /// Read a settings file into the [`Layer::File`] layer.
    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        match ConfigLoader::new(format).load_file(path)? {
            Value::Object(map) => {
                self.merge(Layer::File, map);
                Ok(())
            }
            // the loader only returns tables
            _ => Ok(()),
        }
    }

    /// Read `DONATION_*` variables from a `.env` file without touching the
    /// process environment. With no path, a missing `./.env` is not an error.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        let (iter, origin) = match path {
            Some(path) => (
                dotenvy::from_path_iter(path).map_err(|e| source_error(path, e))?,
                path.to_path_buf(),
            ),
            None => match dotenvy::dotenv_iter() {
                Ok(iter) => (iter, PathBuf::from(".env")),
                Err(e) if e.not_found() => return Ok(()),
                Err(e) => return Err(source_error(Path::new(".env"), e)),
            },
        };

        let vars = iter
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| source_error(&origin, e))?;
        self.merge(Layer::Dotenv, self.env.collect(vars));
        Ok(())
    }

    pub fn load_env(&self) -> Result<()> {
        self.merge(Layer::Environment, self.env.load()?);
        Ok(())
    }

    /// Set one value above every loaded source.
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| ConfigError::Decode(e.to_string()))?;
        self.merge(Layer::Override, [(key.to_string(), value)]);
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .entries
            .read()
            .get(&key.to_lowercase())
            .map(|entry| entry.value.clone())
            .ok_or_else(|| ConfigError::Missing(key.to_string()))?;

        serde_json::from_value(value).map_err(|e| ConfigError::Decode(format!("{}: {}", key, e)))
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(&key.to_lowercase())
    }

    /// Which layer supplied `key`
    pub fn layer_of(&self, key: &str) -> Option<Layer> {
        self.entries.read().get(&key.to_lowercase()).map(|e| e.layer)
    }

    /// Decode everything into `T`, then run its validation.
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let document: Map<String, Value> = self
            .entries
            .read()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect();

        let loaded: T = serde_json::from_value(Value::Object(document))
            .map_err(|e| ConfigError::Decode(e.to_string()))?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn settings(&self) -> Result<Settings> {
        self.load_validated()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn source_error(path: &Path, err: dotenvy::Error) -> ConfigError {
    ConfigError::Source {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

/// Collects the sources to read; [`build`](Self::build) reads them.
pub struct ConfigManagerBuilder {
    prefix: String,
    files: Vec<(PathBuf, Option<FileFormat>)>,
    dotenv: Option<Option<PathBuf>>,
    env: bool,
}

impl Default for ConfigManagerBuilder {
    fn default() -> Self {
        Self {
            prefix: ENV_PREFIX.to_string(),
            files: Vec::new(),
            dotenv: None,
            env: false,
        }
    }
}

impl ConfigManagerBuilder {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// A settings file; `None` detects the format from the file name.
    pub fn add_file(mut self, path: impl Into<PathBuf>, format: Option<FileFormat>) -> Self {
        self.files.push((path.into(), format));
        self
    }

    /// `./.env`, if there is one
    pub fn load_dotenv(mut self) -> Self {
        self.dotenv = Some(None);
        self
    }

    /// A specific `.env` file, which must exist
    pub fn load_dotenv_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.dotenv = Some(Some(path.into()));
        self
    }

    pub fn load_env(mut self) -> Self {
        self.env = true;
        self
    }

    pub fn build(self) -> Result<ConfigManager> {
        let manager = ConfigManager::with_prefix(self.prefix);

        for (path, format) in &self.files {
            let format = match format {
                Some(format) => *format,
                None => ConfigLoader::auto(path)?.format(),
            };
            manager.load_file(path, format)?;
        }
        if let Some(path) = &self.dotenv {
            manager.load_dotenv(path.as_deref())?;
        }
        if self.env {
            manager.load_env()?;
        }

        Ok(manager)
    }
}
