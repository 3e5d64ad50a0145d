//! The `tagsmith config` command for configuration management.

use clap::{Args, Subcommand};
use std::path::Path;
use tagsmith_core::Config;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,

    /// Show config file path
    Path,

    /// Initialize a new config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Set one value, keeping the rest of the file (and its comments) intact
    Set {
        /// Dotted key, e.g. `thresholds.general` or `writer.kind`
        key: String,

        /// New value; parsed as TOML when possible, otherwise stored as a string
        value: String,
    },
}

/// Execute the config command.
pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = Config::load()?;
            let toml = config.to_toml()?;
            println!("{}", toml);
        }

        ConfigCommand::Path => {
            let path = Config::default_path();
            println!("{}", path.display());
        }

        ConfigCommand::Init { force } => {
            let path = Config::default_path();

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at: {}\nUse --force to overwrite.",
                    path.display()
                );
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let config = Config::default();
            std::fs::write(&path, config.to_toml()?)?;

            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }

        ConfigCommand::Set { key, value } => {
            let path = Config::default_path();
            set_in_file(&path, &key, &value)?;
            tracing::info!("Set {key} in {}", path.display());
            println!("{key} = {value}");
        }
    }

    Ok(())
}

/// Apply `key = value` to the config file at `path`, creating it if needed.
fn set_in_file(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let content = if path.exists() {
        std::fs::read_to_string(path)?
    } else {
        String::new()
    };

    let updated = set_value(&content, key, value)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, updated)?;
    Ok(())
}

/// Set `section.field` in a TOML document and return the new text.
///
/// The result must still load as a valid [`Config`]; otherwise the edit is
/// rejected and nothing is written.
fn set_value(content: &str, key: &str, raw: &str) -> anyhow::Result<String> {
    let (section, field) = key
        .split_once('.')
        .filter(|(s, f)| !s.is_empty() && !f.is_empty() && !f.contains('.'))
        .ok_or_else(|| anyhow::anyhow!("Key must look like `section.field`, got {key:?}"))?;

    let defaults = toml::Value::try_from(Config::default())?;
    let known = defaults
        .get(section)
        .and_then(|s| s.as_table())
        .is_some_and(|t| t.contains_key(field));
    if !known {
        anyhow::bail!("Unknown config key: {key}");
    }

    let mut doc: toml_edit::DocumentMut = content.parse()?;
    if !doc.contains_key(section) {
        doc[section] = toml_edit::Item::Table(toml_edit::Table::new());
    }

    let value = raw
        .parse::<toml_edit::Value>()
        .unwrap_or_else(|_| toml_edit::Value::from(raw));
    doc[section][field] = toml_edit::value(value);

    let updated = doc.to_string();
    Config::from_toml(&updated)
        .map_err(|e| anyhow::anyhow!("Refusing to write invalid config: {e}"))?;
    Ok(updated)
}
