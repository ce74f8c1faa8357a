//! Fluent API for building test configurations
//!
//! Every path points inside a private temporary directory, so runs built from
//! the same builder never share a lock file or staging area with other tests.

use backup_orchestrator::config::{
    BackupSettings, Config, ContainerConfig, EncryptionConfig, FilterRule, LogSettings,
    MySqlConfig, RetentionConfig, StorageConfig, TelegramConfig,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    config: Config,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with remote storage and retention disabled
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let work_dir = temp_dir.path().join("work");
        fs::create_dir_all(&work_dir).expect("Failed to create work dir");

        let config = Config {
            lock_file: temp_dir.path().join("backup.lock"),
            backup: BackupSettings {
                temp_dir: work_dir,
                delete_after_upload: true,
                local_dir: temp_dir.path().join("local_backups"),
                history_file: None,
                command_timeout_seconds: 60,
            },
            mysql: MySqlConfig::default(),
            container: ContainerConfig::default(),
            storage: StorageConfig {
                endpoint: "http://127.0.0.1:9000".to_string(),
                access_key: "minio".to_string(),
                secret_key: "minio-secret".to_string(),
                bucket: "backups".to_string(),
                path_prefix: String::new(),
                region: "auto".to_string(),
            },
            retention: RetentionConfig { hours: 0 },
            encryption: EncryptionConfig::default(),
            telegram: TelegramConfig::default(),
            logging: LogSettings::default(),
        };

        Self { temp_dir, config }
    }

    /// Config suitable for `--only-dump` runs: no storage section at all
    pub fn local_only() -> Self {
        let mut builder = Self::new();
        builder.config.storage = StorageConfig::default();
        builder
    }

    pub fn include_schema(mut self, name: &str) -> Self {
        self.config.mysql.include.push(name.to_string());
        self
    }

    pub fn exclude_schema(mut self, name: &str) -> Self {
        self.config.mysql.exclude.push(name.to_string());
        self
    }

    pub fn include_schema_prefix(mut self, prefix: &str) -> Self {
        self.config.mysql.include_prefix.push(prefix.to_string());
        self
    }

    pub fn exclude_schema_prefix(mut self, prefix: &str) -> Self {
        self.config.mysql.exclude_prefix.push(prefix.to_string());
        self
    }

    /// Set the table-level policy applied inside every schema
    pub fn with_table_filters(mut self, rule: FilterRule) -> Self {
        self.config.mysql.table_filters = rule;
        self
    }

    pub fn with_retention_hours(mut self, hours: i64) -> Self {
        self.config.retention.hours = hours;
        self
    }

    pub fn with_encryption(mut self, password: &str) -> Self {
        self.config.encryption.password = password.to_string();
        self
    }

    pub fn with_path_prefix(mut self, prefix: &str) -> Self {
        self.config.storage.path_prefix = prefix.to_string();
        self
    }

    /// Keep staging directories and archives after each target
    pub fn keep_local_files(mut self) -> Self {
        self.config.backup.delete_after_upload = false;
        self
    }

    /// Record history to `history.jsonl` inside the temp dir
    pub fn with_history(mut self) -> Self {
        self.config.backup.history_file = Some(self.temp_dir.path().join("history.jsonl"));
        self
    }

    pub fn with_telegram(mut self, bot_token: &str, chat_id: &str) -> Self {
        self.config.telegram = TelegramConfig {
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        };
        self
    }

    pub fn with_container(mut self, label: &str, container_name: &str) -> Self {
        self.config.container.label = label.to_string();
        self.config.container.container_name = container_name.to_string();
        self
    }

    pub fn with_lock_file(mut self, path: &Path) -> Self {
        self.config.lock_file = path.to_path_buf();
        self
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Build the Config (the temp dir is removed when the builder drops)
    pub fn build(self) -> Config {
        self.config
    }

    /// Keep the temp directory alive alongside the config
    pub fn persist(self) -> (Config, TempDir) {
        (self.config, self.temp_dir)
    }

    /// Serialize the config to `config.toml` in the temp dir
    pub fn write_toml(self) -> (PathBuf, Config, TempDir) {
        let path = self.temp_dir.path().join("config.toml");
        let contents = toml::to_string_pretty(&self.config).expect("Failed to serialize config");
        fs::write(&path, contents).expect("Failed to write config file");
        (path, self.config, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
