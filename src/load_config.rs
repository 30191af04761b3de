//! `load_config` module: loads a static YAML config and injects environment secrets,
//! producing the [`CliConfig`] the `sync` command runs with.
//!
//! # Responsibilities
//! - Parse the user-supplied YAML file into typed sections
//! - Inject secrets from the environment (`PSQL_PASSWORD`, `WIKI_USER`, `WIKI_PASSWORD`)
//! - Decide the destination: local output when `--out` (or `out:`) is given, otherwise
//!   the Confluence page described by the `wiki` section
//! - Resolve relative `template`, `out` and snapshot paths in the file against the config
//!   file's directory (`--out` stays relative to the working directory)
//!
//! # Errors
//! All errors use `anyhow::Error` with enough context to be printed as-is at the CLI.

use anyhow::{Context, Result};
use ci_type_sync_core::config::{
    Destination, PageStoreConfig, SyncConfig, DEFAULT_LOCATOR_KIND, DEFAULT_PAGE_TITLE,
};
use ci_type_sync_core::memory_source::InMemorySource;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::postgres_source::PostgresConfig;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceSection {
    Postgres {
        url: String,
        #[serde(default)]
        user: Option<String>,
    },
    /// Records dumped to a YAML/JSON document, see [`InMemorySource`].
    Snapshot { path: PathBuf },
}

#[derive(Debug, Deserialize)]
pub struct WikiSection {
    pub url: String,
    #[serde(default = "default_page_title")]
    pub page_title: String,
}

fn default_page_title() -> String {
    DEFAULT_PAGE_TITLE.to_string()
}

fn default_locator_kind() -> String {
    DEFAULT_LOCATOR_KIND.to_string()
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    mvn_prefix: Option<String>,
    #[serde(default = "default_locator_kind")]
    locator_kind: String,
    #[serde(default)]
    template: Option<PathBuf>,
    #[serde(default)]
    out: Option<PathBuf>,
    source: SourceSection,
    #[serde(default)]
    wiki: Option<WikiSection>,
}

#[derive(Debug, Clone)]
pub enum SourceConfig {
    Postgres(PostgresConfig),
    Snapshot(PathBuf),
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub sync: SyncConfig,
    pub source: SourceConfig,
    /// `None` selects the built-in template.
    pub template: Option<PathBuf>,
}

fn env_secret(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn relative_to(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Loads a static YAML config file (no secrets) and injects required env vars for secrets.
/// `out` overrides the file's `out` key.
pub fn load_config<P: AsRef<Path>>(path: P, out: Option<PathBuf>) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let base_dir = path_ref.parent().unwrap_or_else(|| Path::new("."));

    let destination = match out.or_else(|| raw.out.map(|o| relative_to(base_dir, o))) {
        Some(out) => Destination::LocalFile(out),
        None => {
            let wiki = raw.wiki.ok_or_else(|| {
                error!("Neither local output nor a wiki section is configured");
                anyhow::anyhow!("Config has no `wiki` section and no local output (--out) was given")
            })?;
            let user = env_secret("WIKI_USER").ok_or_else(|| {
                error!("WIKI_USER environment variable not set");
                anyhow::anyhow!("WIKI_USER environment variable not set")
            })?;
            Destination::Page(PageStoreConfig {
                base_url: wiki.url,
                user,
                password: env_secret("WIKI_PASSWORD"),
                page_title: wiki.page_title,
            })
        }
    };

    let source = match raw.source {
        SourceSection::Postgres { url, user } => SourceConfig::Postgres(PostgresConfig {
            url,
            user: user.or_else(|| env_secret("PSQL_USER")),
            password: env_secret("PSQL_PASSWORD"),
        }),
        SourceSection::Snapshot { path } => {
            SourceConfig::Snapshot(relative_to(base_dir, path))
        }
    };

    let config = CliConfig {
        sync: SyncConfig {
            mvn_prefix: raw
                .mvn_prefix
                .or_else(|| env_secret("MVN_PREFIX"))
                .unwrap_or_default(),
            locator_kind: raw.locator_kind,
            destination,
        },
        source,
        template: raw.template.map(|t| relative_to(base_dir, t)),
    };

    info!(
        source = ?config.source,
        template = ?config.template,
        "Config loaded and merged successfully"
    );
    Ok(config)
}

/// Reads a snapshot of the four record collections.
pub fn load_snapshot(path: &Path) -> Result<InMemorySource> {
    info!(snapshot = %path.display(), "Loading records snapshot");
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot file {}", path.display()))?;
    let snapshot: InMemorySource = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
    info!(
        groups = snapshot.groups.len(),
        types = snapshot.members.len(),
        inclusions = snapshot.inclusions.len(),
        "Snapshot loaded"
    );
    Ok(snapshot)
}
