//! Inclusion/exclusion policy for discovered names
//!
//! A [`FilterRule`] carries exact names and name prefixes. Prefixes are
//! resolved once per run against a live [`Catalog`] into concrete names, and
//! the resulting [`ResolvedFilter`] is then applied to candidate lists.
//!
//! The same engine serves both levels: schemas (the catalog is the schema
//! listing itself) and tables (the catalog is one schema's tables, qualified
//! as `schema.table`).

use crate::config::FilterRule;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::debug;

/// MySQL's own schemas, never backed up
pub const SYSTEM_SCHEMAS: [&str; 4] = ["information_schema", "performance_schema", "mysql", "sys"];

/// Source of names that prefixes are matched against
#[async_trait]
pub trait Catalog: Send + Sync {
    /// All item names, unqualified
    async fn items(&self) -> Result<Vec<String>>;

    /// Form in which a name appears in resolved lists
    fn qualify(&self, item: &str) -> String {
        item.to_string()
    }
}

/// A catalog over an already known list of names
pub struct StaticCatalog {
    names: Vec<String>,
}

impl StaticCatalog {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn items(&self) -> Result<Vec<String>> {
        Ok(self.names.clone())
    }
}

/// Concrete include/exclude lists after prefix resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Dropped whatever the policy says
    pub reserved: Vec<String>,
}

impl ResolvedFilter {
    /// Add names that no policy can admit
    pub fn with_reserved(mut self, names: &[&str]) -> Self {
        self.reserved.extend(names.iter().map(|n| n.to_string()));
        self
    }

    /// Narrow `names` to what the policy admits, keeping input order.
    ///
    /// Reserved names are dropped, a non-empty include list acts as an
    /// allow-list, and exclusion wins over inclusion.
    pub fn apply(&self, names: &[String]) -> Vec<String> {
        let include: HashSet<&str> = self.include.iter().map(String::as_str).collect();
        let exclude: HashSet<&str> = self.exclude.iter().map(String::as_str).collect();

        names
            .iter()
            .filter(|name| !self.reserved.contains(name))
            .filter(|name| include.is_empty() || include.contains(name.as_str()))
            .filter(|name| !exclude.contains(name.as_str()))
            .cloned()
            .collect()
    }
}

/// Turn a rule into concrete lists.
///
/// Exact names are qualified by the catalog; each prefix contributes every
/// catalog item starting with it (case-sensitive). Duplicates are dropped,
/// first occurrence wins. The catalog is only queried when a prefix is set.
pub async fn resolve(rule: &FilterRule, catalog: &dyn Catalog) -> Result<ResolvedFilter> {
    let items = if rule.has_prefixes() {
        catalog.items().await?
    } else {
        Vec::new()
    };

    let resolved = ResolvedFilter {
        include: expand(catalog, &items, &rule.include, &rule.include_prefix),
        exclude: expand(catalog, &items, &rule.exclude, &rule.exclude_prefix),
        reserved: Vec::new(),
    };

    debug!(
        "Resolved filter: include={:?} exclude={:?}",
        resolved.include, resolved.exclude
    );
    Ok(resolved)
}

fn expand(catalog: &dyn Catalog, items: &[String], exact: &[String], prefixes: &[String]) -> Vec<String> {
    let qualified = exact.iter().map(|name| catalog.qualify(name));
    let matched = prefixes.iter().flat_map(move |prefix| {
        items
            .iter()
            .filter(move |item| item.starts_with(prefix.as_str()))
            .map(move |item| catalog.qualify(item))
    });
    dedup(qualified.chain(matched))
}

fn dedup(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names.filter(|name| seen.insert(name.clone())).collect()
}
