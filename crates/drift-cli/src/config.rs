//! Configuration file handling for drift.
//!
//! Looks for `.config/drift.styx` in the current directory or any parent directory.

pub use drift_config::Config;

use drift::EngineConfig;
use std::path::{Path, PathBuf};

/// Load configuration from `.config/drift.styx`, searching up the directory tree.
pub fn load() -> Result<(Config, PathBuf), ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::Io(e.to_string()))?;
    load_from(&cwd)
}

/// Load configuration starting from a specific directory.
pub fn load_from(start: &Path) -> Result<(Config, PathBuf), ConfigError> {
    let config_path = find_config_file(start)?;
    let content =
        std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Io(e.to_string()))?;

    let config: Config =
        facet_styx::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

    Ok((config, config_path))
}

/// Like [`load`], but a missing file yields the default configuration.
pub fn load_or_default() -> Result<Config, ConfigError> {
    match load() {
        Ok((config, path)) => {
            tracing::debug!(path = %path.display(), "loaded configuration");
            Ok(config)
        }
        Err(ConfigError::NotFound) => Ok(Config::default()),
        Err(e) => Err(e),
    }
}

/// Find `.config/drift.styx` by searching up the directory tree.
fn find_config_file(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".config/drift.styx");
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(ConfigError::NotFound);
        }
    }
}

/// Engine settings from the file, with `driver` already resolved.
pub fn engine_config(config: &Config, driver: String) -> EngineConfig {
    let mut engine = EngineConfig::new(driver);
    engine.protected_tables = config.protected.clone();
    if let Some(table) = &config.migrations_table {
        engine.migrations_table = table.clone();
    }
    if let Some(suffix) = &config.fk_suffix {
        engine.fk_suffix = suffix.clone();
    }
    engine
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// No `.config/drift.styx` found in any parent directory
    NotFound,
    /// I/O error reading the file
    Io(String),
    /// Parse error in the Styx file
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound => {
                write!(
                    f,
                    "No .config/drift.styx found in current directory or any parent"
                )
            }
            ConfigError::Io(e) => write!(f, "Failed to read .config/drift.styx: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse .config/drift.styx: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("drift-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn config_is_found_in_a_parent_directory() {
        let root = scratch_dir("config-search");
        std::fs::create_dir_all(root.join(".config")).unwrap();
        std::fs::write(root.join(".config/drift.styx"), "driver mysql\n").unwrap();
        let nested = root.join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, root.join(".config/drift.styx"));
    }

    #[test]
    fn file_settings_reach_the_engine() {
        let config = Config {
            protected: vec!["sessions".to_string()],
            migrations_table: Some("schema_history".to_string()),
            fk_suffix: Some("_ref".to_string()),
            ..Config::default()
        };
        let engine = engine_config(&config, "pg".to_string());
        assert_eq!(engine.driver, "pg");
        assert!(engine.is_protected("sessions"));
        assert!(engine.is_protected("schema_history"));
        assert_eq!(engine.fk_suffix, "_ref");
    }
}
