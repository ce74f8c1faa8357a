//! MySQL schema strategy driven through MySQL Shell
//!
//! Handles:
//! - Schema discovery (`information_schema.schemata`)
//! - Per-schema table filter resolution (`information_schema.tables`)
//! - Parallel, zstd-compressed dumps via `util.dumpSchemas`
//! - Loading a dump back via `util.loadDump`

use super::{BackupTarget, TargetParams, TargetStrategy};
use crate::config::{FilterRule, MySqlConfig};
use crate::managers::filter::{self, Catalog};
use crate::utils::executor::CommandExecutor;
use crate::utils::tabular::parse_name_column;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// File mysqlsh writes at the root of every dump
pub const DUMP_METADATA_FILE: &str = "@.json";

/// Connection settings plus the executor used to reach `mysqlsh`
pub struct MySqlShell {
    config: MySqlConfig,
    executor: Arc<dyn CommandExecutor>,
    timeout: Option<Duration>,
}

impl MySqlShell {
    pub fn new(config: MySqlConfig, executor: Arc<dyn CommandExecutor>, timeout: Option<Duration>) -> Self {
        Self {
            config,
            executor,
            timeout,
        }
    }

    pub fn config(&self) -> &MySqlConfig {
        &self.config
    }

    fn connection_args(&self) -> Vec<String> {
        vec![
            format!("--user={}", self.config.user),
            format!("--password={}", self.config.password),
            format!("--host={}", self.config.host),
            format!("--port={}", self.config.port),
        ]
    }

    async fn run(&self, mode: &str, script: String) -> Result<String> {
        let mut args = self.connection_args();
        args.push(mode.to_string());
        args.push("-e".to_string());
        args.push(script);

        let output = self.executor.run("mysqlsh", &args, self.timeout).await?;
        Ok(output.stdout)
    }

    /// Names of every schema on the server, system schemas included
    pub async fn list_schemas(&self) -> Result<Vec<String>> {
        info!("Listing databases...");
        let output = self
            .run("--sql", "SELECT schema_name FROM information_schema.schemata".to_string())
            .await
            .context("mysqlsh list databases failed")?;

        let schemas = parse_name_column(&output, "schema_name");
        info!("Found databases: {:?}", schemas);
        Ok(schemas)
    }

    /// Unqualified table names of one schema
    pub async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        let query = format!(
            "SELECT table_name FROM information_schema.tables WHERE table_schema = {}",
            sql_string(schema)
        );
        let output = self
            .run("--sql", query)
            .await
            .with_context(|| format!("mysqlsh list tables of {} failed", schema))?;

        Ok(parse_name_column(&output, "table_name"))
    }

    /// Dump one schema into `output_dir`
    pub async fn dump_schema(
        &self,
        schema: &str,
        output_dir: &Path,
        include_tables: &[String],
        exclude_tables: &[String],
    ) -> Result<()> {
        let script = dump_script(
            schema,
            output_dir,
            self.config.threads,
            include_tables,
            exclude_tables,
        );
        debug!("Generated dump script for {}", schema);

        info!("Dumping database {} to {:?}", schema, output_dir);
        self.run("--js", script)
            .await
            .with_context(|| format!("mysqlsh dump of {} failed", schema))?;
        info!("Dump completed for {}", schema);
        Ok(())
    }

    /// Load a dump directory (the one holding `@.json`) into the server
    pub async fn load_dump(&self, dump_dir: &Path) -> Result<String> {
        let options = json!({
            "threads": self.config.threads,
            "ignoreVersion": true,
        });
        let script = format!(
            "util.loadDump({}, {})",
            js_string(&dump_dir.display().to_string()),
            options
        );

        info!("Loading dump from {:?}", dump_dir);
        self.run("--js", script)
            .await
            .context("mysqlsh recovery failed")
    }
}

/// Quote a value as a JavaScript string literal
fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// Quote a value as a SQL string literal
fn sql_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

/// `util.dumpSchemas` invocation for one schema
pub fn dump_script(
    schema: &str,
    output_dir: &Path,
    threads: u32,
    include_tables: &[String],
    exclude_tables: &[String],
) -> String {
    let mut options = json!({
        "threads": threads,
        "compression": "zstd",
    });
    if !include_tables.is_empty() {
        options["includeTables"] = json!(include_tables);
    }
    if !exclude_tables.is_empty() {
        options["excludeTables"] = json!(exclude_tables);
    }

    format!(
        "util.dumpSchemas({}, {}, {})",
        json!([schema]),
        js_string(&output_dir.display().to_string()),
        options
    )
}

/// Tables of one schema, qualified as `schema.table`
struct SchemaTables<'a> {
    shell: &'a MySqlShell,
    schema: &'a str,
}

#[async_trait]
impl Catalog for SchemaTables<'_> {
    async fn items(&self) -> Result<Vec<String>> {
        self.shell.list_tables(self.schema).await
    }

    fn qualify(&self, item: &str) -> String {
        format!("{}.{}", self.schema, item)
    }
}

/// Backs up each admitted schema of a MySQL server
pub struct MySqlStrategy {
    shell: MySqlShell,
}

impl MySqlStrategy {
    pub fn new(shell: MySqlShell) -> Self {
        Self { shell }
    }

    fn table_rule(&self) -> &FilterRule {
        &self.shell.config().table_filters
    }
}

#[async_trait]
impl TargetStrategy for MySqlStrategy {
    fn kind(&self) -> &'static str {
        "mysql"
    }

    fn filter_rule(&self) -> FilterRule {
        self.shell.config().schema_rule()
    }

    fn reserved_names(&self) -> &'static [&'static str] {
        &filter::SYSTEM_SCHEMAS
    }

    async fn list_targets(&self) -> Result<Vec<String>> {
        self.shell.list_schemas().await
    }

    async fn resolve_targets(&self, names: &[String]) -> Result<Vec<BackupTarget>> {
        let rule = self.table_rule();
        let mut targets = Vec::with_capacity(names.len());

        for name in names {
            let resolved = if rule.is_empty() {
                filter::ResolvedFilter::default()
            } else {
                let catalog = SchemaTables {
                    shell: &self.shell,
                    schema: name,
                };
                filter::resolve(rule, &catalog)
                    .await
                    .with_context(|| format!("Failed to resolve table filters for {}", name))?
            };

            targets.push(BackupTarget {
                name: name.clone(),
                params: TargetParams::Schema {
                    include_tables: resolved.include,
                    exclude_tables: resolved.exclude,
                },
            });
        }

        Ok(targets)
    }

    async fn dump(&self, target: &BackupTarget, staging: &Path) -> Result<()> {
        let (include, exclude) = match &target.params {
            TargetParams::Schema {
                include_tables,
                exclude_tables,
            } => (include_tables.as_slice(), exclude_tables.as_slice()),
            TargetParams::Container { .. } => {
                anyhow::bail!("{} is not a schema target", target.name)
            }
        };

        self.shell
            .dump_schema(&target.name, staging, include, exclude)
            .await
    }

    async fn locate_artifact(&self, target: &BackupTarget, staging: &Path) -> Result<PathBuf> {
        if !staging.is_dir() {
            anyhow::bail!("dump directory for {} is missing: {:?}", target.name, staging);
        }
        Ok(staging.to_path_buf())
    }
}
