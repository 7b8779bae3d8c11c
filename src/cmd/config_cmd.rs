//! `comments config`: where the effective settings come from.

use std::path::Path;

use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;

use comments::config::{ENV_VARS, KEYS, LoadedConfig, MANIFEST_FILE, env_string, user_config_path};

use crate::args::FormatArgs;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,

    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show resolved configuration
    Show {
        /// Annotate every key with the source that set it
        #[arg(long)]
        effective: bool,
    },

    /// List COMMENTS_* environment variables and their current values
    Env,
}

#[derive(Serialize)]
struct KeyOutput {
    key: &'static str,
    value: String,
    source: String,
}

#[derive(Serialize)]
struct ManifestOutput {
    path: String,
    found: bool,
}

#[derive(Serialize)]
struct EffectiveOutput {
    storage_root: String,
    storage_exists: bool,
    keys: Vec<KeyOutput>,
    manifests: Vec<ManifestOutput>,
}

#[derive(Serialize)]
struct EnvOutput {
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<&'static str>,
    default: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<&'static str>,
    description: &'static str,
}

fn structured(format: OutputFormat) -> bool {
    matches!(format, OutputFormat::Json | OutputFormat::Yaml)
}

pub fn run(args: ConfigArgs, root: &Path, loaded: &LoadedConfig) -> Result<(), String> {
    let format = args.format.resolve();
    match args.command {
        ConfigCommand::Show { effective: false } if !structured(format) => {
            let yaml = serde_yaml::to_string(&loaded.config)
                .map_err(|e| format!("failed to serialize config: {}", e))?;
            println!("{}", yaml.trim());
            Ok(())
        }
        ConfigCommand::Show { .. } => run_effective(root, loaded, format),
        ConfigCommand::Env => run_env(format),
    }
}

/// Each key's value rendered the way a manifest would spell it.
fn key_values(loaded: &LoadedConfig) -> Result<Vec<KeyOutput>, String> {
    let value = serde_json::to_value(&loaded.config)
        .map_err(|e| format!("failed to serialize config: {}", e))?;

    Ok(KEYS
        .iter()
        .copied()
        .map(|key| KeyOutput {
            key,
            value: match value.get(key) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Null) | None => "-".to_string(),
                Some(other) => other.to_string(),
            },
            source: loaded.origin(key).to_string(),
        })
        .collect())
}

fn run_effective(root: &Path, loaded: &LoadedConfig, format: OutputFormat) -> Result<(), String> {
    let storage = loaded.config.storage_root(root);
    let mut manifests = Vec::new();
    if let Some(user) = user_config_path() {
        manifests.push(ManifestOutput {
            found: user.is_file(),
            path: user.display().to_string(),
        });
    }
    let site = root.join(MANIFEST_FILE);
    manifests.push(ManifestOutput {
        found: site.is_file(),
        path: site.display().to_string(),
    });

    let data = EffectiveOutput {
        storage_exists: storage.is_dir(),
        storage_root: storage.display().to_string(),
        keys: key_values(loaded)?,
        manifests,
    };

    if structured(format) {
        return output::print_structured(&data, format);
    }

    let pretty = format == OutputFormat::Pretty;
    let width = KEYS.iter().map(|k| k.len()).max().unwrap_or(0);
    for entry in &data.keys {
        let line = format!("{:width$}  {}", entry.key, entry.value, width = width);
        if pretty {
            println!("{}  {}", line, format!("({})", entry.source).as_str().dimmed());
        } else {
            println!("{}  ({})", line, entry.source);
        }
    }

    println!();
    let missing = if data.storage_exists { "" } else { " (missing)" };
    println!("storage root: {}{}", data.storage_root, missing);
    for manifest in &data.manifests {
        let state = if manifest.found { "found" } else { "absent" };
        println!("manifest: {} ({})", manifest.path, state);
    }
    Ok(())
}

fn run_env(format: OutputFormat) -> Result<(), String> {
    let vars: Vec<EnvOutput> = ENV_VARS
        .iter()
        .map(|var| EnvOutput {
            name: var.name,
            value: env_string(var.name),
            key: Some(var.config_path).filter(|p| *p != "-"),
            default: var.default,
            values: var.values,
            description: var.description,
        })
        .collect();

    if structured(format) {
        return output::print_structured(&vars, format);
    }

    let pretty = format == OutputFormat::Pretty;
    for var in &vars {
        let value = match &var.value {
            Some(v) => format!("= {}", v),
            None => "unset".to_string(),
        };
        let target = var.key.map(|k| format!(" -> {}", k)).unwrap_or_default();
        if pretty {
            println!("{} {}{}", var.name.bold(), value, target.as_str().dimmed());
        } else {
            println!("{} {}{}", var.name, value, target);
        }
        match var.values {
            Some(values) => println!("    {} (default: {}, one of: {})", var.description, var.default, values),
            None => println!("    {} (default: {})", var.description, var.default),
        }
    }
    Ok(())
}
