//! TOML configuration.
//!
//! ```toml
//! [solr]
//! base_url = "http://localhost:8983/solr"
//! default_core = "articles"
//!
//! [write]
//! update_mode = "optimistic-concurrency"
//! commit_within_ms = 1000
//!
//! [types.article]
//! filter_query = "doc_type:article"
//! ```
//!
//! [`Config`] doubles as the [`TypeResolver`] for the request builder:
//! per-type entries under `[types.*]` win, `[solr]` supplies the fallback.

use anyhow::{Context, Result};
use serde::Deserialize;
use solr_adapter_core::commit::{CommitPolicy, CommitType};
use solr_adapter_core::hooks::{TypeResolver, DEFAULT_UNIQUE_KEY};
use solr_adapter_core::request::{BuildOptions, Operation, DEFAULT_VERSION_FIELD};
use solr_adapter_core::serializer::ArrayUpdate;
use solr_adapter_core::update_mode::UpdateMode;
use std::collections::HashMap;
use std::path::Path;

use crate::logging::LogFormat;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub solr: SolrConfig,
    #[serde(default)]
    pub write: WriteConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub types: HashMap<String, TypeConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SolrConfig {
    pub base_url: String,
    #[serde(default)]
    pub default_core: Option<String>,
    #[serde(default)]
    pub enable_real_time_get: bool,
    #[serde(default = "default_unique_key")]
    pub unique_key: String,
    #[serde(default = "default_version_field")]
    pub version_field: String,
    /// Applied by the HTTP transport only.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Overrides the `select` route for searches.
    #[serde(default)]
    pub search_path: Option<String>,
}

fn default_unique_key() -> String {
    DEFAULT_UNIQUE_KEY.to_string()
}
fn default_version_field() -> String {
    DEFAULT_VERSION_FIELD.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct WriteConfig {
    #[serde(default)]
    pub update_mode: UpdateMode,
    #[serde(default)]
    pub commit_type: CommitType,
    #[serde(default)]
    pub commit_within_ms: u64,
    #[serde(default)]
    pub array_updates: ArrayUpdate,
    #[serde(default = "default_refresh_after_write")]
    pub refresh_after_write: bool,
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            update_mode: UpdateMode::default(),
            commit_type: CommitType::default(),
            commit_within_ms: 0,
            array_updates: ArrayUpdate::default(),
            refresh_after_write: default_refresh_after_write(),
        }
    }
}

fn default_refresh_after_write() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// Per-type routing under `[types.<name>]`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TypeConfig {
    #[serde(default)]
    pub core: Option<String>,
    #[serde(default)]
    pub filter_query: Option<String>,
    #[serde(default)]
    pub unique_key: Option<String>,
}

impl Config {
    /// Defaults everywhere except the server URL.
    pub fn minimal(base_url: impl Into<String>) -> Self {
        Self {
            solr: SolrConfig {
                base_url: base_url.into(),
                default_core: None,
                enable_real_time_get: false,
                unique_key: default_unique_key(),
                version_field: default_version_field(),
                timeout_secs: None,
                search_path: None,
            },
            write: WriteConfig::default(),
            logging: LoggingConfig::default(),
            types: HashMap::new(),
        }
    }

    pub fn commit_policy(&self) -> CommitPolicy {
        let within = Some(self.write.commit_within_ms).filter(|ms| *ms > 0);
        CommitPolicy::new(self.write.commit_type, within)
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            enable_real_time_get: self.solr.enable_real_time_get,
            version_field: self.solr.version_field.clone(),
            commit: self.commit_policy(),
            search_path: self.solr.search_path.clone(),
        }
    }

    fn type_config(&self, type_name: &str) -> Option<&TypeConfig> {
        self.types.get(type_name)
    }
}

impl TypeResolver for Config {
    fn core_for_type(&self, type_name: &str) -> Option<String> {
        self.type_config(type_name)
            .and_then(|t| t.core.clone())
            .or_else(|| self.solr.default_core.clone())
    }

    fn filter_query_for_type(&self, type_name: &str, _operation: Operation) -> Option<String> {
        self.type_config(type_name).and_then(|t| t.filter_query.clone())
    }

    fn unique_key_for_type(&self, type_name: &str) -> String {
        self.type_config(type_name)
            .and_then(|t| t.unique_key.clone())
            .unwrap_or_else(|| self.solr.unique_key.clone())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    let base_url = config.solr.base_url.as_str();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        anyhow::bail!(
            "solr.base_url must be an http(s) URL, got '{}'",
            config.solr.base_url
        );
    }

    if config.solr.unique_key.trim().is_empty() {
        anyhow::bail!("solr.unique_key must not be empty");
    }

    if config.solr.version_field.trim().is_empty() {
        anyhow::bail!("solr.version_field must not be empty");
    }

    if config.solr.timeout_secs == Some(0) {
        anyhow::bail!("solr.timeout_secs must be > 0 when set");
    }

    for (name, t) in &config.types {
        if matches!(t.unique_key.as_deref(), Some(k) if k.trim().is_empty()) {
            anyhow::bail!("types.{}.unique_key must not be empty", name);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse_config(
            r#"
[solr]
base_url = "http://localhost:8983/solr"
"#,
        )
        .unwrap();
        assert_eq!(config.solr.unique_key, "id");
        assert_eq!(config.solr.version_field, "_version_");
        assert_eq!(config.write.update_mode, UpdateMode::OptimisticConcurrency);
        assert_eq!(config.write.commit_type, CommitType::None);
        assert!(config.write.refresh_after_write);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(!config.build_options().enable_real_time_get);
    }

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r#"
[solr]
base_url = "https://solr.example.com/solr"
default_core = "main"
enable_real_time_get = true
timeout_secs = 5

[write]
update_mode = "atomic"
commit_type = "soft"
commit_within_ms = 1500
array_updates = "add-remove"
refresh_after_write = false

[logging]
level = "debug"
format = "json"

[types.article]
core = "articles"
filter_query = "doc_type:article"
unique_key = "article_id"
"#,
        )
        .unwrap();
        assert_eq!(config.write.update_mode, UpdateMode::Atomic);
        assert_eq!(config.write.array_updates, ArrayUpdate::AddRemove);
        assert_eq!(config.commit_policy(), CommitPolicy::new(CommitType::Soft, Some(1500)));
        assert_eq!(config.logging.format, LogFormat::Json);

        assert_eq!(config.core_for_type("article").as_deref(), Some("articles"));
        assert_eq!(config.core_for_type("comment").as_deref(), Some("main"));
        assert_eq!(
            config
                .filter_query_for_type("article", Operation::Query)
                .as_deref(),
            Some("doc_type:article")
        );
        assert_eq!(config.filter_query_for_type("comment", Operation::Query), None);
        assert_eq!(config.unique_key_for_type("article"), "article_id");
        assert_eq!(config.unique_key_for_type("comment"), "id");
    }

    #[test]
    fn test_zero_commit_within_is_ignored() {
        let mut config = Config::minimal("http://localhost:8983/solr");
        config.write.commit_type = CommitType::Hard;
        assert_eq!(config.commit_policy(), CommitPolicy::new(CommitType::Hard, None));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = parse_config("[solr]\nbase_url = \"localhost:8983\"\n").unwrap_err();
        assert!(err.to_string().contains("solr.base_url"));
    }

    #[test]
    fn test_rejects_unknown_update_mode() {
        let err = parse_config(
            "[solr]\nbase_url = \"http://h/solr\"\n[write]\nupdate_mode = \"eventual\"\n",
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = parse_config("[solr]\nbase_url = \"http://h/solr\"\ntimeout_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }
}
