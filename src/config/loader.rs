use super::types::*;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&contents)?;
    expand_paths(&mut config);
    validate_config(&config)?;
    Ok(config)
}

fn expand_paths(config: &mut Config) {
    config.lock_file = super::expand_tilde(&config.lock_file);
    config.backup.temp_dir = super::expand_tilde(&config.backup.temp_dir);
    config.backup.local_dir = super::expand_tilde(&config.backup.local_dir);
    if let Some(ref history) = config.backup.history_file {
        config.backup.history_file = Some(super::expand_tilde(history));
    }
    if let Some(ref dir) = config.logging.directory {
        config.logging.directory = Some(super::expand_tilde(dir));
    }
}

/// Validate the configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.lock_file.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "lock_file must not be empty".to_string(),
        ));
    }

    if config.mysql.port == 0 {
        return Err(ConfigError::ValidationError(
            "mysql.port must be non-zero".to_string(),
        ));
    }

    if config.mysql.threads == 0 {
        return Err(ConfigError::ValidationError(
            "mysql.threads must be at least 1".to_string(),
        ));
    }

    if config.container.backup_command.is_empty() {
        return Err(ConfigError::ValidationError(
            "container.backup_command must not be empty".to_string(),
        ));
    }

    for prefix in config
        .mysql
        .include_prefix
        .iter()
        .chain(&config.mysql.exclude_prefix)
        .chain(&config.mysql.table_filters.include_prefix)
        .chain(&config.mysql.table_filters.exclude_prefix)
    {
        if prefix.is_empty() {
            return Err(ConfigError::ValidationError(
                "filter prefixes must not be empty (an empty prefix matches everything)".to_string(),
            ));
        }
    }

    Ok(())
}

/// Check the settings a remote upload run cannot do without.
///
/// Kept out of `load_config` so `--only-dump` runs work with no storage section.
pub fn validate_remote_storage(storage: &StorageConfig) -> Result<()> {
    if storage.endpoint.is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.endpoint is required unless --only-dump is used".to_string(),
        ));
    }
    if storage.bucket.is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.bucket is required unless --only-dump is used".to_string(),
        ));
    }
    Ok(())
}
