//! # MusicQueue Configuration Module
//!
//! This module provides configuration management for MusicQueue, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Type-safe getters and setters for configuration values
//! - Thread-safe singleton access pattern
//!
//! ## Usage
//!
//! ```no_run
//! use mqconfig::get_config;
//!
//! // Get the global configuration
//! let config = get_config();
//!
//! // Access configuration values
//! let port = config.get_http_port();
//! let app_id = config.get_qobuz_app_id()?;
//!
//! // Update configuration values
//! config.set_http_port(9000)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::info;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("musicqueue.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load MusicQueue configuration"));
}

const ENV_CONFIG_DIR: &str = "MUSICQUEUE_CONFIG";
const ENV_PREFIX: &str = "MUSICQUEUE_CONFIG__";
const ENV_QOBUZ_APP_ID: &str = "QOBUZ_APP_ID";

// Default values for configuration
const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_BASE_URL: &str = "127.0.0.1";
const DEFAULT_LOG_BUFFER_CAPACITY: usize = 1000;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;
const DEFAULT_QOBUZ_API_BASE: &str = "https://www.qobuz.com/api.json/0.2";
const DEFAULT_CATALOG_TIMEOUT_SECS: usize = 10;
const DEFAULT_CATALOG_CONNECT_TIMEOUT_SECS: usize = 5;
const DEFAULT_QUEUE_STREAM_BUFFER: usize = 64;

/// Macro to generate getter/setter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<usize> {
            match self.get_value($path) {
                Ok(Value::Number(n)) => Ok(n.as_u64().map(|v| v as usize).unwrap_or($default)),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, size: usize) -> Result<()> {
            let n = Number::from(size);
            self.set_value($path, Value::Number(n))
        }
    };
}

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

/// Configuration manager for MusicQueue
///
/// This structure manages the application configuration, including:
/// - Loading configuration from YAML files
/// - Merging with default configuration
/// - Handling environment variable overrides
/// - Providing typed getters/setters for configuration values
///
/// # Examples
///
/// ```no_run
/// use mqconfig::get_config;
///
/// let config = get_config();
/// let port = config.get_http_port();
/// println!("HTTP port: {}", port);
/// ```
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self.lock_data().clone();
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        // 1. Try provided directory
        if !directory.is_empty() {
            return directory.to_string();
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var=ENV_CONFIG_DIR, path=%env_path, "Trying to load config from env");
            return env_path;
        }

        // 3. Try current directory
        if Path::new(".musicqueue").exists() {
            return ".musicqueue".to_string();
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(".musicqueue");
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        // Default fallback
        ".musicqueue".to_string()
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        // Test write permission
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        fs::read_dir(path)?;

        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `MUSICQUEUE_CONFIG` environment variable
    /// 3. `.musicqueue` in the current directory
    /// 4. `.musicqueue` in the user's home directory
    ///
    /// The directory is created if it doesn't exist, and validated for read/write permissions.
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir_path = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&dir_path))?;
        Ok(dir_path)
    }

    /// Loads the configuration from the specified directory
    ///
    /// This method:
    /// 1. Determines the configuration directory
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external config.yaml file if present
    /// 4. Applies environment variable overrides
    /// 5. Saves the merged configuration
    ///
    /// # Arguments
    ///
    /// * `directory` - The directory containing the config.yaml file, or empty to use defaults
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir=%config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let mut default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        let yaml_data = if let Ok(data) = fs::read(&path) {
            info!(config_file=%path, "Loaded config file");
            data
        } else {
            info!(config_file=%path, "Config file not found, using default embedded config");
            DEFAULT_CONFIG.as_bytes().to_vec()
        };

        let external_value: Value = serde_yaml::from_slice(&yaml_data)?;
        merge_yaml(&mut default_value, &external_value);
        let mut config_value = Self::lower_keys_value(default_value);

        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    fn lock_data(&self) -> MutexGuard<'_, Value> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the directory the configuration was loaded from
    pub fn directory(&self) -> &str {
        &self.config_dir
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.lock_data())?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["host", "http_port"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.lock_data();
            Self::set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        Self::get_value_internal(&self.lock_data(), path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                match map.get(Value::String(key.to_lowercase())) {
                    Some(next) => current = next,
                    None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                let _ = Self::set_value_internal(config, &key_path, yaml_value);
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    let key = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    new_map.insert(key, Self::lower_keys_value(v));
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    /// Résout un chemin relatif ou absolu et crée le répertoire si nécessaire
    fn resolve_and_create_dir(&self, dir_path: &str) -> Result<String> {
        let path = Path::new(dir_path);

        let absolute_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.config_dir).join(path)
        };

        if !absolute_path.exists() {
            fs::create_dir_all(&absolute_path)?;
            info!(directory=%absolute_path.display(), "Created managed directory");
        }

        Ok(absolute_path.to_string_lossy().to_string())
    }

    /// Récupère un répertoire géré par la configuration
    ///
    /// Le répertoire peut être absolu ou relatif au répertoire de configuration.
    /// Il sera créé s'il n'existe pas.
    ///
    /// # Exemple
    ///
    /// ```no_run
    /// use mqconfig::get_config;
    ///
    /// let config = get_config();
    /// let dir = config.get_managed_dir(&["queues", "directory"], "queues")?;
    /// println!("Queue database directory: {}", dir);
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn get_managed_dir(&self, path: &[&str], default: &str) -> Result<String> {
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

    /// Gets the base URL (host part) advertised by the HTTP server
    pub fn get_base_url(&self) -> String {
        match self.get_value(&["host", "base_url"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => {
                tracing::warn!("Base URL is not set, using default {}", DEFAULT_BASE_URL);
                DEFAULT_BASE_URL.to_string()
            }
        }
    }

    /// Gets the HTTP port from configuration
    ///
    /// Returns the configured HTTP port, or the default port (8080) if not configured or invalid.
    pub fn get_http_port(&self) -> u16 {
        let parsed = match self.get_value(&["host", "http_port"]) {
            Ok(Value::Number(n)) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Ok(Value::String(s)) => s.parse::<u16>().ok(),
            _ => None,
        };

        parsed.unwrap_or_else(|| {
            tracing::warn!("Invalid or missing HTTP port, using default {}", DEFAULT_HTTP_PORT);
            DEFAULT_HTTP_PORT
        })
    }

    /// Sets the HTTP port in configuration
    pub fn set_http_port(&self, port: u16) -> Result<()> {
        self.set_value(&["host", "http_port"], Value::Number(Number::from(port)))
    }

    /// Gets the Qobuz application id used for catalog searches
    ///
    /// The configured value wins; the `QOBUZ_APP_ID` environment variable is
    /// used when the configuration leaves it empty.
    pub fn get_qobuz_app_id(&self) -> Result<String> {
        if let Ok(Value::String(s)) = self.get_value(&["catalog", "qobuz", "app_id"]) {
            if !s.trim().is_empty() {
                return Ok(s.trim().to_string());
            }
        }

        match env::var(ENV_QOBUZ_APP_ID) {
            Ok(id) if !id.trim().is_empty() => Ok(id.trim().to_string()),
            _ => Err(anyhow!("QOBUZ_APP_ID must be set for Qobuz access.")),
        }
    }

    /// Gets the base URL of the Qobuz REST API
    pub fn get_qobuz_api_base(&self) -> String {
        match self.get_value(&["catalog", "qobuz", "api_base"]) {
            Ok(Value::String(s)) if !s.is_empty() => s.trim_end_matches('/').to_string(),
            _ => DEFAULT_QOBUZ_API_BASE.to_string(),
        }
    }

    impl_usize_config!(
        get_catalog_timeout_secs,
        set_catalog_timeout_secs,
        &["catalog", "qobuz", "timeout_secs"],
        DEFAULT_CATALOG_TIMEOUT_SECS
    );

    impl_usize_config!(
        get_catalog_connect_timeout_secs,
        set_catalog_connect_timeout_secs,
        &["catalog", "qobuz", "connect_timeout_secs"],
        DEFAULT_CATALOG_CONNECT_TIMEOUT_SECS
    );

    impl_usize_config!(
        get_queue_stream_buffer,
        set_queue_stream_buffer,
        &["queues", "stream_buffer"],
        DEFAULT_QUEUE_STREAM_BUFFER
    );

    impl_usize_config!(
        get_log_cache_size,
        set_log_cache_size,
        &["host", "logger", "buffer_capacity"],
        DEFAULT_LOG_BUFFER_CAPACITY
    );

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    /// Récupère le niveau de log minimum depuis la configuration
    pub fn get_log_min_level(&self) -> Result<String> {
        match self.get_value(&["host", "logger", "min_level"]) {
            Ok(Value::String(s)) => Ok(s),
            _ => Ok(DEFAULT_LOG_MIN_LEVEL.to_string()),
        }
    }
}

/// Returns the global configuration instance
///
/// The configuration is lazily loaded on first access.
///
/// # Examples
///
/// ```no_run
/// use mqconfig::get_config;
///
/// let config = get_config();
/// let port = config.get_http_port();
/// ```
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges external YAML configuration into default configuration
///
/// - For mappings (objects), it merges keys from external into default
/// - For scalars and sequences, external values replace default values
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

#[cfg(test)]
mod tests {
    use super::*;

    fn load_in(dir: &tempfile::TempDir) -> Config {
        Config::load_config(dir.path().to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_defaults_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);

        assert_eq!(config.get_http_port(), 8080);
        assert_eq!(config.get_catalog_timeout_secs().unwrap(), 10);
        assert_eq!(config.get_catalog_connect_timeout_secs().unwrap(), 5);
        assert_eq!(config.get_queue_stream_buffer().unwrap(), 64);
        assert_eq!(
            config.get_qobuz_api_base(),
            "https://www.qobuz.com/api.json/0.2"
        );
        assert!(dir.path().join("config.yaml").exists());
    }

    #[test]
    fn test_external_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "host:\n  http_port: 9001\ncatalog:\n  qobuz:\n    app_id: \"abc\"\n",
        )
        .unwrap();

        let config = load_in(&dir);
        assert_eq!(config.get_http_port(), 9001);
        assert_eq!(config.get_qobuz_app_id().unwrap(), "abc");
        // Les clés absentes du fichier gardent la valeur par défaut
        assert_eq!(config.get_catalog_timeout_secs().unwrap(), 10);
    }

    #[test]
    fn test_set_value_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);
        config.set_http_port(7070).unwrap();

        let reloaded = load_in(&dir);
        assert_eq!(reloaded.get_http_port(), 7070);
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);
        assert!(config.get_value(&["nope", "missing"]).is_err());
    }

    #[test]
    fn test_managed_dir_is_created_relative_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);
        let queues = config.get_managed_dir(&["queues", "directory"], "queues").unwrap();
        assert!(Path::new(&queues).is_dir());
        assert!(Path::new(&queues).starts_with(dir.path()));
    }

    #[test]
    fn test_merge_yaml_replaces_scalars_and_merges_maps() {
        let mut default: Value = serde_yaml::from_str("a:\n  b: 1\n  c: 2\n").unwrap();
        let external: Value = serde_yaml::from_str("a:\n  c: 3\n  d: 4\n").unwrap();
        merge_yaml(&mut default, &external);

        assert_eq!(Config::get_value_internal(&default, &["a", "b"]).unwrap(), Value::from(1));
        assert_eq!(Config::get_value_internal(&default, &["a", "c"]).unwrap(), Value::from(3));
        assert_eq!(Config::get_value_internal(&default, &["a", "d"]).unwrap(), Value::from(4));
    }
}
