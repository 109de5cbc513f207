//! # PMOPlayer Configuration Module
//!
//! Configuration management for PMOPlayer:
//! - Embedded default configuration merged with an external `config.yaml`
//! - Environment variable overrides (`PMOPLAYER_CONFIG__SECTION__KEY=value`)
//! - Path-addressed getters and setters, persisted on every write
//! - Managed directories resolved against the configuration directory
//!
//! ## Usage
//!
//! ```no_run
//! use pmoconfig::get_config;
//!
//! let config = get_config();
//! let level = config.get_log_min_level()?;
//! let state_dir = config.get_managed_dir(&["player", "state", "directory"], "state")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::info;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmoplayer.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load PMOPlayer configuration"));
}

const ENV_CONFIG_DIR: &str = "PMOPLAYER_CONFIG";
const ENV_PREFIX: &str = "PMOPLAYER_CONFIG__";
const CONFIG_DIR_NAME: &str = ".pmoplayer";

const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

/// Macro to generate getter/setter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => Ok(b),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Macro to generate getter/setter for string values with default
macro_rules! impl_string_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<String> {
            match self.get_value($path) {
                Ok(Value::String(s)) if !s.trim().is_empty() => Ok(s),
                _ => Ok($default.to_string()),
            }
        }

        pub fn $setter(&self, value: String) -> Result<()> {
            self.set_value($path, Value::String(value))
        }
    };
}

/// Configuration manager for PMOPlayer
///
/// The YAML tree is held behind a mutex and written back to `config.yaml`
/// after every mutation.
#[derive(Debug)]
pub struct Config {
    config_dir: PathBuf,
    path: PathBuf,
    data: Mutex<Value>,
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> PathBuf {
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return PathBuf::from(env_path);
        }

        if Path::new(CONFIG_DIR_NAME).exists() {
            return PathBuf::from(CONFIG_DIR_NAME);
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config;
            }
        }

        PathBuf::from(CONFIG_DIR_NAME)
    }

    /// Creates the directory if needed and checks it is writable
    fn prepare_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!(
                "Configuration path {} is not a directory",
                path.display()
            ));
        }

        let probe = path.join(".write_test");
        fs::write(&probe, b"test")?;
        fs::remove_file(&probe)?;

        Ok(())
    }

    /// Loads the configuration from `directory` (empty string: auto-detect)
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `PMOPLAYER_CONFIG` environment variable
    /// 3. `.pmoplayer` in the current directory
    /// 4. `.pmoplayer` in the user's home directory
    ///
    /// The embedded defaults are merged with `config.yaml` when present, then
    /// environment overrides are applied and the merged tree is saved back.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        Self::prepare_config_dir(&config_dir)?;
        info!(config_dir = %config_dir.display(), "Using config directory");

        let path = config_dir.join("config.yaml");

        let mut merged = lower_keys(serde_yaml::from_str(DEFAULT_CONFIG)?);

        match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path.display(), "Loaded config file");
                let external: Value = serde_yaml::from_slice(&data)?;
                merge_yaml(&mut merged, &lower_keys(external));
            }
            Err(_) => {
                info!(config_file = %path.display(), "Config file not found, using embedded defaults");
            }
        }

        let mut value = merged;
        apply_env_overrides(&mut value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(value),
        };

        config.save()?;
        Ok(config)
    }

    /// Directory holding `config.yaml`
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    fn data(&self) -> Result<MutexGuard<'_, Value>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("Configuration lock poisoned"))
    }

    /// Saves the current configuration to `config.yaml`
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.data()?)?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Keys from the root (e.g. `&["player", "blobs", "enabled"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.data()?;
            set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error when the path does not exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data()?;
        get_value_internal(&data, path)
    }

    /// Résout un chemin relatif ou absolu et crée le répertoire si nécessaire
    fn resolve_and_create_dir(&self, dir_path: &str) -> Result<PathBuf> {
        let path = Path::new(dir_path);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        };

        if !absolute.exists() {
            fs::create_dir_all(&absolute)?;
            info!(directory = %absolute.display(), "Created managed directory");
        }

        Ok(absolute)
    }

    /// Récupère un répertoire géré par la configuration
    ///
    /// Le répertoire peut être absolu ou relatif au répertoire de
    /// configuration. Il est créé s'il n'existe pas. Si la clé est absente,
    /// `default` est enregistré dans la configuration.
    ///
    /// # Exemple
    ///
    /// ```no_run
    /// use pmoconfig::get_config;
    ///
    /// let config = get_config();
    /// let dir = config.get_managed_dir(&["player", "blobs", "directory"], "blobs")?;
    /// println!("Blob store directory: {}", dir.display());
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn get_managed_dir(&self, path: &[&str], default: &str) -> Result<PathBuf> {
        let dir_path = match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => {
                self.set_managed_dir(path, default.to_string())?;
                default.to_string()
            }
        };
        self.resolve_and_create_dir(&dir_path)
    }

    /// Définit un répertoire géré par la configuration
    pub fn set_managed_dir(&self, path: &[&str], directory: String) -> Result<()> {
        self.set_value(path, Value::String(directory))
    }

    impl_string_config!(
        get_log_min_level,
        set_log_min_level,
        &["host", "logger", "min_level"],
        DEFAULT_LOG_MIN_LEVEL
    );

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    /// Lit un booléen à `path`, `default` si absent ou d'un autre type
    pub fn get_bool(&self, path: &[&str], default: bool) -> bool {
        match self.get_value(path) {
            Ok(Value::Bool(b)) => b,
            _ => default,
        }
    }

    /// Lit une chaîne non vide à `path`, `default` sinon
    pub fn get_string(&self, path: &[&str], default: &str) -> String {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s,
            _ => default.to_string(),
        }
    }
}

/// Returns the global configuration instance
///
/// The instance is loaded lazily on first access.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    if path.is_empty() {
        *data = value;
        return Ok(());
    }
    if let Value::Mapping(map) = data {
        let key = Value::String(path[0].to_lowercase());
        if path.len() == 1 {
            map.insert(key, value);
        } else {
            let entry = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
            set_value_internal(entry, &path[1..], value)?;
        }
        Ok(())
    } else {
        Err(anyhow!("Current node is not a map"))
    }
}

fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
    let mut current = data;
    for (i, key) in path.iter().enumerate() {
        let Value::Mapping(map) = current else {
            return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
        };
        match map.get(&Value::String(key.to_lowercase())) {
            Some(next) => current = next,
            None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
        }
    }
    Ok(current.clone())
}

fn apply_env_overrides(config: &mut Value) {
    for (key, value) in env::vars() {
        let Some(suffix) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let key_path = suffix.split("__").collect::<Vec<_>>();
        let parsed = serde_yaml::from_str::<Value>(&value).unwrap_or(Value::String(value));
        let _ = set_value_internal(config, &key_path, parsed);
    }
}

fn lower_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| match k {
                    Value::String(s) => (Value::String(s.to_lowercase()), lower_keys(v)),
                    other => (other, lower_keys(v)),
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys).collect()),
        other => other,
    }
}

/// Merges `external` into `default`
///
/// Mappings are merged key by key; scalars and sequences from `external`
/// replace the default value.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}
