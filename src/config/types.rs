use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Single-instance lock file shared by every workflow
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,

    #[serde(default)]
    pub backup: BackupSettings,

    #[serde(default)]
    pub mysql: MySqlConfig,

    #[serde(default)]
    pub container: ContainerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub encryption: EncryptionConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub logging: LogSettings,
}

/// Local working area and publishing behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackupSettings {
    /// Where staging directories and archives are created
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Remove staging directory and archive once a target is done
    #[serde(default = "default_delete_after_upload")]
    pub delete_after_upload: bool,

    /// Destination directory for `--only-dump` runs
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,

    /// Optional JSON-lines file receiving one record per backed up target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_file: Option<PathBuf>,

    /// Upper bound for each external process (0 disables the bound)
    #[serde(default = "default_command_timeout")]
    pub command_timeout_seconds: u64,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            delete_after_upload: default_delete_after_upload(),
            local_dir: default_local_dir(),
            history_file: None,
            command_timeout_seconds: default_command_timeout(),
        }
    }
}

impl BackupSettings {
    /// Per-process bound, `None` when disabled
    pub fn command_timeout(&self) -> Option<Duration> {
        match self.command_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Inclusion/exclusion policy for names discovered at run time
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct FilterRule {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub include_prefix: Vec<String>,
    #[serde(default)]
    pub exclude_prefix: Vec<String>,
}

impl FilterRule {
    pub fn has_prefixes(&self) -> bool {
        !self.include_prefix.is_empty() || !self.exclude_prefix.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty() && !self.has_prefixes()
    }
}

/// MySQL connection and schema selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MySqlConfig {
    #[serde(default = "default_mysql_host")]
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    #[serde(default = "default_mysql_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,

    /// Parallel dump/load threads handed to mysqlsh
    #[serde(default = "default_threads")]
    pub threads: u32,

    /// Schema-level policy
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub include_prefix: Vec<String>,
    #[serde(default)]
    pub exclude_prefix: Vec<String>,

    /// Table-level policy, resolved per schema
    #[serde(default)]
    pub table_filters: FilterRule,
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self {
            host: default_mysql_host(),
            port: default_mysql_port(),
            user: default_mysql_user(),
            password: String::new(),
            threads: default_threads(),
            include: Vec::new(),
            exclude: Vec::new(),
            include_prefix: Vec::new(),
            exclude_prefix: Vec::new(),
            table_filters: FilterRule::default(),
        }
    }
}

impl MySqlConfig {
    /// Schema-level policy as a filter rule
    pub fn schema_rule(&self) -> FilterRule {
        FilterRule {
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            include_prefix: self.include_prefix.clone(),
            exclude_prefix: self.exclude_prefix.clone(),
        }
    }
}

/// Containerized application whose built-in backup is captured
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContainerConfig {
    /// Target identifier used in filenames and reports
    #[serde(default = "default_container_label")]
    pub label: String,
    #[serde(default = "default_container_name")]
    pub container_name: String,
    #[serde(default = "default_backup_command")]
    pub backup_command: Vec<String>,
    #[serde(default = "default_container_backup_dir")]
    pub backup_dir: String,
    #[serde(default = "default_container_backup_suffix")]
    pub backup_suffix: String,
    /// Copied best-effort next to the backup archive
    #[serde(default = "default_container_config_files")]
    pub config_files: Vec<String>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            label: default_container_label(),
            container_name: default_container_name(),
            backup_command: default_backup_command(),
            backup_dir: default_container_backup_dir(),
            backup_suffix: default_container_backup_suffix(),
            config_files: default_container_config_files(),
        }
    }
}

/// S3-compatible object storage
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub path_prefix: String,
    #[serde(default = "default_region")]
    pub region: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    /// Maximum artifact age; zero or negative disables enforcement
    #[serde(default = "default_retention_hours")]
    pub hours: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            hours: default_retention_hours(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EncryptionConfig {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogSettings {
    /// Directory for rolling log files (console only when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_max_files")]
    pub max_files: u32,
    /// File events as JSON lines instead of text
    #[serde(default)]
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            directory: None,
            level: default_log_level(),
            max_files: default_log_max_files(),
            json: false,
        }
    }
}

// Default value functions

fn default_lock_file() -> PathBuf { PathBuf::from("/tmp/backup.lock") }
fn default_temp_dir() -> PathBuf { std::env::temp_dir() }
fn default_delete_after_upload() -> bool { true }
fn default_local_dir() -> PathBuf { PathBuf::from("local_backups") }
fn default_command_timeout() -> u64 { 6 * 3600 }
fn default_mysql_host() -> String { "127.0.0.1".to_string() }
fn default_mysql_port() -> u16 { 3306 }
fn default_mysql_user() -> String { "root".to_string() }
fn default_threads() -> u32 { 4 }
fn default_container_label() -> String { "gitlab".to_string() }
fn default_container_name() -> String { "gitlab".to_string() }
fn default_backup_command() -> Vec<String> {
    vec!["gitlab-rake".to_string(), "gitlab:backup:create".to_string()]
}
fn default_container_backup_dir() -> String { "/var/opt/gitlab/backups".to_string() }
fn default_container_backup_suffix() -> String { "_gitlab_backup.tar".to_string() }
fn default_container_config_files() -> Vec<String> {
    vec![
        "/etc/gitlab/gitlab.rb".to_string(),
        "/etc/gitlab/gitlab-secrets.json".to_string(),
    ]
}
fn default_region() -> String { "auto".to_string() }
fn default_retention_hours() -> i64 { 24 * 7 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
