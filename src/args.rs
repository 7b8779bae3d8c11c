//! Shared CLI argument structs for consistent flag definitions across commands.
//!
//! Use `#[command(flatten)]` to include them in command-specific Args structs.

use std::path::PathBuf;

use clap::Args;

use comments::comment::{DATE_KEY, MetaValue, parse_date};
use comments::config::{ConfigSource, LoadedConfig};
use comments::render::Format;

use crate::output::OutputFormat;

// ============================================================================
// FormatArgs - Output format flags
// ============================================================================

/// Common output format flags.
///
/// Provides consistent --format/-f and --json flags across commands.
/// Use `resolve()` to get the effective format with TTY auto-detection.
#[derive(Args, Clone, Debug, Default)]
pub struct FormatArgs {
    /// Output format (auto-detects TTY for pretty vs plain)
    #[arg(short = 'f', long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Output as JSON (shorthand for --format=json)
    #[arg(long, conflicts_with = "format")]
    pub json: bool,
}

impl FormatArgs {
    /// Resolve the effective output format.
    ///
    /// Handles --json shorthand and applies TTY auto-detection for pretty mode.
    pub fn resolve(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format.resolve()
        }
    }
}

// ============================================================================
// StorageArgs - Storage overrides
// ============================================================================

/// Flags overriding where comments live and how they render.
#[derive(Args, Clone, Debug, Default)]
pub struct StorageArgs {
    /// Comment storage directory (relative to --root unless absolute)
    #[arg(long, value_name = "DIR", global = true)]
    pub source_dir: Option<PathBuf>,

    /// Comment file extension
    #[arg(long, value_name = "EXT", global = true)]
    pub extension: Option<String>,

    /// Render format for comment bodies
    #[arg(long, value_enum, global = true)]
    pub render: Option<Format>,
}

impl StorageArgs {
    /// Apply CLI overrides on top of the loaded config.
    pub fn apply(&self, loaded: &mut LoadedConfig) {
        let config = &mut loaded.config;
        let mut keys = Vec::new();
        if let Some(dir) = &self.source_dir {
            config.source_dir = dir.to_string_lossy().to_string();
            // An explicit directory beats an inherited storage root
            config.path = None;
            keys.extend(["source_dir", "path"]);
        }
        if let Some(ext) = &self.extension {
            config.extension = ext.clone();
            keys.push("extension");
        }
        if let Some(format) = self.render {
            config.output_format = format;
            keys.push("output_format");
        }
        loaded.record(ConfigSource::CliFlag, &keys);
    }
}

// ============================================================================
// Metadata flags
// ============================================================================

/// Parse a `KEY=VALUE` metadata flag.
///
/// Keys end up before a `: ` on their own line, so they can't contain a colon
/// or a line break; values can't span lines either. A `date` value must parse
/// as a date.
pub fn parse_meta(raw: &str) -> Result<(String, MetaValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() || key.contains([':', '\n', '\r']) {
        return Err(format!("invalid metadata key '{}'", key));
    }
    if value.contains(['\n', '\r']) {
        return Err(format!("metadata value for '{}' spans lines", key));
    }
    let value = value.trim();
    if key == DATE_KEY {
        let date = parse_date(value)
            .ok_or_else(|| format!("invalid date '{}' (expected e.g. 2024-05-01 10:00:00+02:00)", value))?;
        return Ok((key.to_string(), MetaValue::Date(date)));
    }
    Ok((key.to_string(), MetaValue::from(value)))
}
