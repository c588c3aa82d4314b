//! Configuration for seforim ingestion.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags (applied by the CLI)
//! 2. Environment variables (SEFORIM_HOME, SEFORIM_OUTPUT, SEFORIM_DATABASE,
//!    SEFORIM_API_URL, SEFORIM_CONCURRENCY)
//! 3. Config file (.seforim/config.yaml)
//! 4. Defaults (~/.seforim)
//!
//! Config file discovery:
//! - Searches current directory and parents for .seforim/config.yaml
//! - Paths in config file are relative to the project root (parent of .seforim/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::sefaria::{ClientSettings, DEFAULT_BASE_URL};
use crate::adapters::RetryPolicy;
use crate::core::DEFAULT_CONCURRENCY;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const CONFIG_DIR: &str = ".seforim";
const CONFIG_FILE: &str = "config.yaml";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub request_timeout_seconds: Option<u64>,
    pub deadline_seconds: Option<u64>,
    pub retry: Option<RetryPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory
    pub home: Option<String>,
    /// Generated tree (index files, run report, audit log)
    pub output: Option<String>,
    /// SQLite database file
    pub database: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestConfig {
    pub concurrency: Option<usize>,
    pub create_books: Option<bool>,
    /// Extra blacklist names or glob patterns
    #[serde(default)]
    pub blacklist: Vec<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub home: PathBuf,
    pub output: PathBuf,
    pub database: PathBuf,
    pub api: ClientSettings,
    /// Verses processed concurrently (at least 1)
    pub concurrency: usize,
    pub create_books: bool,
    pub blacklist: Vec<String>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
pub fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge a config file, environment lookups and defaults
pub fn resolve_config<F>(
    config_file: Option<PathBuf>,
    file: Option<ConfigFile>,
    env: F,
    default_home: PathBuf,
) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let file_paths = file.as_ref().map(|f| f.paths.clone()).unwrap_or_default();
    let api = file.as_ref().map(|f| f.api.clone()).unwrap_or_default();
    let ingest = file.map(|f| f.ingest).unwrap_or_default();

    // Base directory is the parent of .seforim/ (i.e., grandparent of config.yaml)
    let base_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .and_then(Path::parent)
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let pick = |var: &str, configured: &Option<String>| -> Option<PathBuf> {
        env(var)
            .map(PathBuf::from)
            .or_else(|| configured.as_deref().map(|p| resolve_path(&base_dir, p)))
    };

    let home = pick("SEFORIM_HOME", &file_paths.home).unwrap_or(default_home);
    let output = pick("SEFORIM_OUTPUT", &file_paths.output).unwrap_or_else(|| home.join("generated"));
    let database =
        pick("SEFORIM_DATABASE", &file_paths.database).unwrap_or_else(|| output.join("seforim.db"));

    let concurrency = match env("SEFORIM_CONCURRENCY") {
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .with_context(|| format!("Invalid SEFORIM_CONCURRENCY: {}", raw))?,
        None => ingest.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
    };

    let defaults = ClientSettings::default();
    let api = ClientSettings {
        base_url: env("SEFORIM_API_URL")
            .or(api.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        request_timeout: api
            .request_timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout),
        deadline: api
            .deadline_seconds
            .map(Duration::from_secs)
            .unwrap_or(defaults.deadline),
        retry: api.retry.unwrap_or(defaults.retry),
    };

    Ok(ResolvedConfig {
        home,
        output,
        database,
        api,
        concurrency: concurrency.max(1),
        create_books: ingest.create_books.unwrap_or(true),
        blacklist: ingest.blacklist,
        config_file,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);

    let config_file = find_config_file();
    let file = config_file.as_deref().map(load_config_file).transpose()?;

    resolve_config(config_file, file, |var| std::env::var(var).ok(), default_home)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
