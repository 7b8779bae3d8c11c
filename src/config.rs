//! Configuration for comment storage and rendering.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. CLI flags (highest priority)
//! 2. Environment variables (COMMENTS_*)
//! 3. Site manifest (<root>/.comments.yaml)
//! 4. User global (~/.config/comments/config.yaml)
//! 5. Built-in defaults (lowest priority)

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::render::Format;
use crate::store::Store;
use crate::uid::DEFAULT_MAX_RETRIES;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Comment storage directory, relative to the site root unless absolute
    pub source_dir: String,
    /// Comment file extension
    pub extension: String,
    /// Render format for comment bodies
    pub output_format: Format,
    /// Attempts at generating an unused identifier
    pub max_retries: usize,
    /// Show a placeholder body for unreadable comments instead of failing
    pub tolerant: bool,
    /// Storage root used as is, ignoring `source_dir`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Config keys in display order.
pub const KEYS: &[&str] = &[
    "source_dir",
    "extension",
    "output_format",
    "max_retries",
    "tolerant",
    "path",
];

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: "comments".to_string(),
            extension: ".md".to_string(),
            output_format: Format::Html5,
            max_retries: DEFAULT_MAX_RETRIES,
            tolerant: false,
            path: None,
        }
    }
}

impl Config {
    /// Storage root for a site. `path` wins over `source_dir`.
    pub fn storage_root(&self, site_root: &Path) -> PathBuf {
        if let Some(path) = &self.path {
            return PathBuf::from(path);
        }
        let dir = Path::new(&self.source_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            site_root.join(dir)
        }
    }

    pub fn store(&self, site_root: &Path) -> Store {
        Store::new(self.storage_root(site_root), &self.extension)
    }
}

// ============================================================================
// Config Source Tracking
// ============================================================================

/// Source of a configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Built-in default
    Default,
    /// User global config (~/.config/comments/config.yaml)
    UserGlobal,
    /// Site manifest (.comments.yaml)
    SiteManifest(String),
    /// Environment variable
    EnvVar(String),
    /// CLI flag
    CliFlag,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::UserGlobal => write!(f, "~/.config/comments/config.yaml"),
            ConfigSource::SiteManifest(path) => write!(f, "{}", path),
            ConfigSource::EnvVar(name) => write!(f, "${}", name),
            ConfigSource::CliFlag => write!(f, "CLI flag"),
        }
    }
}

// ============================================================================
// Environment Variable Registry
// ============================================================================

/// Environment variable definition for documentation.
pub struct EnvVar {
    pub name: &'static str,
    pub description: &'static str,
    pub default: &'static str,
    /// Config field this maps to
    pub config_path: &'static str,
    pub values: Option<&'static str>,
}

/// Registry of all supported environment variables.
pub const ENV_VARS: &[EnvVar] = &[
    EnvVar {
        name: "COMMENTS_PATH",
        description: "Storage root, overriding source_dir entirely",
        default: "<root>/comments",
        config_path: "path",
        values: Some("path"),
    },
    EnvVar {
        name: "COMMENTS_SOURCE_DIR",
        description: "Comment storage directory below the site root",
        default: "comments",
        config_path: "source_dir",
        values: Some("path"),
    },
    EnvVar {
        name: "COMMENTS_EXTENSION",
        description: "Comment file extension",
        default: ".md",
        config_path: "extension",
        values: None,
    },
    EnvVar {
        name: "COMMENTS_OUTPUT_FORMAT",
        description: "Render format for comment bodies",
        default: "html5",
        config_path: "output_format",
        values: Some("html5, xhtml, markdown"),
    },
    EnvVar {
        name: "COMMENTS_MAX_RETRIES",
        description: "Attempts at generating an unused identifier",
        default: "10",
        config_path: "max_retries",
        values: Some("positive number"),
    },
    EnvVar {
        name: "COMMENTS_TOLERANT",
        description: "Substitute unreadable comments instead of failing",
        default: "false",
        config_path: "tolerant",
        values: Some("1, true, yes"),
    },
    EnvVar {
        name: "COMMENTS_LOG",
        description: "Log filter (falls back to RUST_LOG)",
        default: "warn",
        config_path: "-",
        values: Some("tracing filter, e.g. debug or comments=trace"),
    },
];

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Parse a truthy/falsy string (1/true/yes, 0/false/no).
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Parse a string environment variable.
///
/// Returns `Some(value)` if set and non-empty, `None` otherwise.
pub fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// ============================================================================
// Config Loading
// ============================================================================

/// Site manifest file name.
pub const MANIFEST_FILE: &str = ".comments.yaml";

static DEFAULT_SOURCE: ConfigSource = ConfigSource::Default;

/// Result of loading configuration with source tracking.
#[derive(Debug)]
pub struct LoadedConfig {
    /// The merged configuration
    pub config: Config,
    /// Sources that contributed to this config (in order of application)
    pub sources: Vec<ConfigSource>,
    /// Last source to set each key; absent keys are defaults
    pub origins: BTreeMap<&'static str, ConfigSource>,
}

impl LoadedConfig {
    pub fn new(config: Config) -> Self {
        LoadedConfig {
            config,
            sources: vec![ConfigSource::Default],
            origins: BTreeMap::new(),
        }
    }

    /// Note that `source` set `keys`. Nothing is recorded for an empty list.
    pub fn record(&mut self, source: ConfigSource, keys: &[&'static str]) {
        if keys.is_empty() {
            return;
        }
        for key in keys {
            self.origins.insert(*key, source.clone());
        }
        self.sources.push(source);
    }

    pub fn origin(&self, key: &str) -> &ConfigSource {
        self.origins.get(key).unwrap_or(&DEFAULT_SOURCE)
    }
}

/// Config key set by an environment variable.
pub fn env_key(name: &str) -> Option<&'static str> {
    ENV_VARS
        .iter()
        .find(|var| var.name == name)
        .map(|var| var.config_path)
        .filter(|path| *path != "-")
}

/// Load configuration from defaults, manifests and the environment.
///
/// Does not apply CLI flags (those are handled by the commands).
pub fn load_config(site_root: &Path) -> LoadedConfig {
    load_config_with(site_root, user_config_path().as_deref(), env_string)
}

/// `load_config` with the user manifest location and the environment injected.
pub fn load_config_with<F>(site_root: &Path, user_config: Option<&Path>, lookup: F) -> LoadedConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut loaded = LoadedConfig::new(Config::default());

    if let Some(overlay) = user_config.and_then(load_manifest) {
        let keys = merge(&mut loaded.config, &overlay);
        loaded.record(ConfigSource::UserGlobal, &keys);
    }

    let manifest = site_root.join(MANIFEST_FILE);
    if let Some(overlay) = load_manifest(&manifest) {
        let keys = merge(&mut loaded.config, &overlay);
        loaded.record(ConfigSource::SiteManifest(MANIFEST_FILE.to_string()), &keys);
    }

    let mut env_sources = Vec::new();
    apply_env(&mut loaded.config, &mut env_sources, lookup);
    for source in env_sources {
        if let ConfigSource::EnvVar(name) = &source
            && let Some(key) = env_key(name)
        {
            loaded.record(source.clone(), &[key]);
        }
    }

    loaded
}

/// Get the user config file path (~/.config/comments/config.yaml).
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("comments").join("config.yaml"))
}

/// Load a manifest file, returning None if it doesn't exist or can't be parsed.
pub fn load_manifest(path: &Path) -> Option<Config> {
    let content = fs::read_to_string(path).ok()?;
    match serde_yaml::from_str(&content) {
        Ok(config) => {
            debug!(path = %path.display(), "loaded config manifest");
            Some(config)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unparsable config manifest");
            None
        }
    }
}

/// Apply COMMENTS_* overrides read through `lookup`. Invalid values are ignored.
pub fn apply_env<F>(config: &mut Config, sources: &mut Vec<ConfigSource>, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = |name: &str| sources.push(ConfigSource::EnvVar(name.to_string()));

    if let Some(path) = lookup("COMMENTS_PATH") {
        config.path = Some(path);
        applied("COMMENTS_PATH");
    }
    if let Some(dir) = lookup("COMMENTS_SOURCE_DIR") {
        config.source_dir = dir;
        applied("COMMENTS_SOURCE_DIR");
    }
    if let Some(ext) = lookup("COMMENTS_EXTENSION") {
        config.extension = ext;
        applied("COMMENTS_EXTENSION");
    }
    if let Some(format) = lookup("COMMENTS_OUTPUT_FORMAT").and_then(|v| v.parse().ok()) {
        config.output_format = format;
        applied("COMMENTS_OUTPUT_FORMAT");
    }
    if let Some(n) = lookup("COMMENTS_MAX_RETRIES")
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
    {
        config.max_retries = n;
        applied("COMMENTS_MAX_RETRIES");
    }
    if let Some(tolerant) = lookup("COMMENTS_TOLERANT").and_then(|v| parse_bool(&v)) {
        config.tolerant = tolerant;
        applied("COMMENTS_TOLERANT");
    }
}

/// Merge overlay config into base config, returning the keys taken from it.
///
/// Non-default values in overlay override values in base.
pub fn merge(base: &mut Config, overlay: &Config) -> Vec<&'static str> {
    let defaults = Config::default();
    let mut taken = Vec::new();
    if overlay.source_dir != defaults.source_dir {
        base.source_dir = overlay.source_dir.clone();
        taken.push("source_dir");
    }
    if overlay.extension != defaults.extension {
        base.extension = overlay.extension.clone();
        taken.push("extension");
    }
    if overlay.output_format != defaults.output_format {
        base.output_format = overlay.output_format;
        taken.push("output_format");
    }
    if overlay.max_retries != defaults.max_retries {
        base.max_retries = overlay.max_retries;
        taken.push("max_retries");
    }
    if overlay.tolerant != defaults.tolerant {
        base.tolerant = overlay.tolerant;
        taken.push("tolerant");
    }
    if overlay.path.is_some() {
        base.path = overlay.path.clone();
        taken.push("path");
    }
    taken
}

// ============================================================================
// Tests
// ============================================================================
