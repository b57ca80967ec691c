//! Config command - inspect and edit the docket configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

use docket_core::models::config::DocketConfig;

use super::default_config_path;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Where to write (default: --config or the user config directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print one value, addressed as `section.key`
    Get {
        /// e.g. "sync.auto_sync_threshold"
        key: String,
    },

    /// Change one value; the result must still be a valid configuration
    Set {
        key: String,
        /// JSON literal, or plain text for string values
        value: String,
    },

    /// Print where the configuration file lives
    Path,
}

/// The configuration file a command operates on.
struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    fn resolve(config_path: Option<&str>) -> Self {
        Self {
            path: config_path.map(PathBuf::from).unwrap_or_else(default_config_path),
        }
    }

    /// The stored configuration, or defaults when no file exists yet.
    fn load(&self) -> anyhow::Result<DocketConfig> {
        if self.path.exists() {
            Ok(DocketConfig::from_file(&self.path)?)
        } else {
            Ok(DocketConfig::default())
        }
    }

    fn store(&self, config: &DocketConfig, target: &Path) -> anyhow::Result<()> {
        config.validate()?;
        if let Some(dir) = target.parent() {
            fs::create_dir_all(dir)?;
        }
        config.save(target)?;
        Ok(())
    }
}

pub async fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let file = ConfigFile::resolve(config_path);
    match args.command {
        ConfigCommand::Show => show(&file),
        ConfigCommand::Init { output, force } => init(&file, output, force),
        ConfigCommand::Get { key } => get(&file, &key),
        ConfigCommand::Set { key, value } => set(&file, &key, &value),
        ConfigCommand::Path => path(&file),
    }
}

/// `sync.auto_sync_threshold` -> `/sync/auto_sync_threshold`
fn pointer(key: &str) -> anyhow::Result<String> {
    if key.is_empty() || key.split('.').any(str::is_empty) {
        anyhow::bail!("Invalid configuration key: '{}'", key);
    }
    Ok(format!("/{}", key.replace('.', "/")))
}

fn show(file: &ConfigFile) -> anyhow::Result<()> {
    if !file.path.exists() {
        eprintln!(
            "{} {} does not exist, showing defaults",
            style("ℹ").blue(),
            file.path.display()
        );
    }
    println!("{}", serde_json::to_string_pretty(&file.load()?)?);
    Ok(())
}

fn init(file: &ConfigFile, output: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let target = output.unwrap_or_else(|| file.path.clone());
    if target.exists() && !force {
        anyhow::bail!(
            "{} already exists (pass --force to replace it)",
            target.display()
        );
    }

    let config = DocketConfig::default();
    file.store(&config, &target)?;

    println!("{} Wrote {}", style("✓").green(), target.display());
    println!(
        "  auto-sync threshold {}, weight tolerance {}, fallback {}",
        config.sync.auto_sync_threshold,
        config.validation.weight_tolerance,
        if config.extraction.enable_fallback { "on" } else { "off" }
    );
    Ok(())
}

fn get(file: &ConfigFile, key: &str) -> anyhow::Result<()> {
    let tree = serde_json::to_value(file.load()?)?;
    let value = tree
        .pointer(&pointer(key)?)
        .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", key))?;
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn set(file: &ConfigFile, key: &str, raw: &str) -> anyhow::Result<()> {
    let mut tree = serde_json::to_value(file.load()?)?;
    let slot = tree
        .pointer_mut(&pointer(key)?)
        .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", key))?;
    if slot.is_object() {
        anyhow::bail!("{} is a section; set one of its keys instead", key);
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    *slot = value.clone();

    let config: DocketConfig = serde_json::from_value(tree)
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))?;
    file.store(&config, &file.path)?;

    println!("{} {} = {}", style("✓").green(), key, value);
    Ok(())
}

fn path(file: &ConfigFile) -> anyhow::Result<()> {
    println!("{}", file.path.display());
    if !file.path.exists() {
        eprintln!(
            "{} not created yet, run `docket config init`",
            style("ℹ").blue()
        );
    }
    Ok(())
}
