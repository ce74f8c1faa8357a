//! Test fixtures and sample data
//!
//! Canned tool output in the shapes `mysqlsh` and `docker` actually print.

use std::fs;
use std::path::{Path, PathBuf};

/// System schemas a real server always reports
pub const SYSTEM_SCHEMA_ROWS: [&str; 4] = ["information_schema", "mysql", "performance_schema", "sys"];

/// `mysqlsh --sql` output listing `schemas` plus the system schemas
pub fn schema_listing(schemas: &[&str]) -> String {
    let mut out = String::from(
        "WARNING: Using a password on the command line interface can be insecure.\nSCHEMA_NAME\n",
    );
    for name in SYSTEM_SCHEMA_ROWS.iter().take(2).chain(schemas).chain(SYSTEM_SCHEMA_ROWS.iter().skip(2)) {
        out.push_str(name);
        out.push('\n');
    }
    out
}

/// Table listing in the boxed format mysqlsh uses on a terminal
pub fn table_listing(tables: &[&str]) -> String {
    let mut out = String::from("+------------+\n| TABLE_NAME |\n+------------+\n");
    for name in tables {
        out.push_str(name);
        out.push('\n');
    }
    out.push_str("+------------+\n");
    out
}

/// `ls -1t` output of a GitLab backup directory, newest first
pub fn gitlab_backup_listing() -> &'static str {
    "1700003600_2023_11_14_16.5.1_gitlab_backup.tar\n\
     1700000000_2023_11_14_16.5.1_gitlab_backup.tar\n\
     backup_information.yml\n"
}

/// Lay out a minimal MySQL Shell dump (metadata plus one chunk) in `dir`
pub fn write_dump_dir(dir: &Path) -> PathBuf {
    fs::create_dir_all(dir).expect("Failed to create dump dir");
    fs::write(dir.join("@.json"), r#"{"dumper":"mysqlsh Ver 8.0.36","version":"2.0.1"}"#)
        .expect("Failed to write dump metadata");
    fs::write(dir.join("app_db@users@@0.tsv.zst"), b"\x28\xb5\x2f\xfd").expect("Failed to write chunk");
    dir.to_path_buf()
}

/// Minimal valid config TOML, relying on defaults for everything else
pub fn minimal_config_toml() -> &'static str {
    r#"
lock_file = "{lock_file}"

[backup]
temp_dir = "{temp_dir}"

[storage]
endpoint = "https://account.r2.cloudflarestorage.com"
access_key = "key"
secret_key = "secret"
bucket = "backups"
"#
}

/// Full config exercising every section
pub fn full_config_toml() -> &'static str {
    r#"
lock_file = "{lock_file}"

[backup]
temp_dir = "{temp_dir}"
delete_after_upload = false
local_dir = "{temp_dir}/local"
history_file = "{temp_dir}/history.jsonl"
command_timeout_seconds = 0

[mysql]
host = "db.internal"
port = 3307
user = "backup"
password = "pw"
threads = 8
include_prefix = ["app_"]
exclude = ["app_scratch"]

[mysql.table_filters]
exclude_prefix = ["tmp_"]

[container]
label = "gitlab"
container_name = "gitlab-web"

[storage]
endpoint = "http://minio:9000"
access_key = "minio"
secret_key = "minio-secret"
bucket = "db-backups"
path_prefix = "/nightly/"

[retention]
hours = 72

[encryption]
password = "zip-secret"

[telegram]
bot_token = "123:abc"
chat_id = "-100200300"

[logging]
level = "debug"
max_files = 3
json = true
"#
}

/// Substitute the `{lock_file}` and `{temp_dir}` placeholders
pub fn render_config(template: &str, dir: &Path) -> String {
    template
        .replace("{lock_file}", &dir.join("backup.lock").display().to_string())
        .replace("{temp_dir}", &dir.display().to_string())
}
