//! Tether CLI
//!
//! Loads node plugins the way a host would and reports what they register.
//!
//! ## Usage
//!
//! ```bash
//! tether plugins list --dir target/debug
//! tether plugins describe Add --dir target/debug
//! TETHER_PLUGIN_PATH=/opt/tether/plugins tether plugins list
//! ```

use std::path::PathBuf;

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use tether_node::{HostConfig, NodeError, NodeManager, NodeRegistry, PluginLoadReport};

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Inspect tether node plugins", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Work with plugin modules
    Plugins {
        #[command(subcommand)]
        command: PluginCommands,
    },
}

#[derive(clap::Args)]
struct Discovery {
    /// Plugin directory to scan (repeatable, added after configured ones)
    #[arg(long = "dir", value_name = "DIR")]
    dirs: Vec<PathBuf>,

    /// Host configuration file (TOML); defaults to the environment
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Fail on the first module that does not load completely
    #[arg(long)]
    strict: bool,
}

#[derive(Subcommand)]
enum PluginCommands {
    /// Load plugins and print every registered node label
    List {
        #[command(flatten)]
        discovery: Discovery,
    },

    /// Print the UI descriptor of registered nodes as JSON
    Describe {
        /// Node labels
        #[arg(value_name = "LABEL", required = true)]
        labels: Vec<String>,

        #[command(flatten)]
        discovery: Discovery,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log = tether_log::init_with(log_config(cli.verbose)).context("initialising logging")?;

    match cli.command {
        Commands::Plugins { command } => match command {
            PluginCommands::List { discovery } => list(&discovery),
            PluginCommands::Describe { labels, discovery } => describe(&labels, &discovery),
        },
    }
}

fn log_config(verbose: u8) -> tether_log::Config {
    let config = tether_log::Config::from_env();
    let explicit = std::env::var_os(tether_log::LOG_ENV).is_some() || std::env::var_os("RUST_LOG").is_some();
    match verbose {
        0 if explicit => config,
        0 => config.with_level("warn"),
        1 => config.with_level("info"),
        2 => config.with_level("debug"),
        _ => config.with_level("trace"),
    }
}

fn host_config(discovery: &Discovery) -> anyhow::Result<HostConfig> {
    let mut config = match &discovery.config {
        Some(path) => HostConfig::from_file(path)?,
        None => HostConfig::from_env(),
    };
    config.plugin_dirs.extend(discovery.dirs.iter().cloned());
    config.fail_on_load_error |= discovery.strict;
    Ok(config)
}

fn load(discovery: &Discovery) -> anyhow::Result<NodeRegistry> {
    let config = host_config(discovery)?;
    if config.plugin_dirs.is_empty() {
        bail!("no plugin directories: pass --dir, --config or set {}", tether_node::PLUGIN_PATH_ENV);
    }

    let mut registry = NodeRegistry::with_config(config);
    let reports = registry.load_configured_plugins()?;
    for report in reports.iter().filter(|report| !report.is_complete()) {
        summarize_failure(report);
    }
    tracing::info!(modules = reports.len(), nodes = registry.len(), "plugins loaded");
    Ok(registry)
}

fn summarize_failure(report: &PluginLoadReport) {
    match &report.error {
        Some(error) => eprintln!("warning: {error}"),
        None => eprintln!(
            "warning: {} registered {} of {} nodes",
            report.module, report.registered, report.total
        ),
    }
}

fn list(discovery: &Discovery) -> anyhow::Result<()> {
    let registry = load(discovery)?;
    registry.display_node_factories();
    for label in registry.labels() {
        println!("{label}");
    }
    Ok(())
}

fn describe(labels: &[String], discovery: &Discovery) -> anyhow::Result<()> {
    let registry = load(discovery)?;
    for label in labels {
        if !registry.contains(label) {
            return Err(NodeError::NotFound(label.clone()).into());
        }
        let Some(descriptor) = registry.descriptor(label) else {
            bail!("node '{label}' publishes no descriptor");
        };
        let json = descriptor
            .to_ui_json()
            .with_context(|| format!("serialising descriptor of '{label}'"))?;
        println!("{json}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn dirs_extend_the_configuration() {
        let cli = Cli::try_parse_from(["tether", "plugins", "list", "--dir", "a", "--dir", "b", "--strict"]).unwrap();
        let Commands::Plugins {
            command: PluginCommands::List { discovery },
        } = cli.command
        else {
            panic!("parsed the wrong command");
        };
        let dirs: Vec<_> = discovery.dirs.iter().map(|d| d.to_string_lossy().into_owned()).collect();
        assert_eq!(dirs, ["a", "b"]);
        assert!(discovery.strict);
    }

    #[test]
    fn describe_needs_a_label() {
        assert!(Cli::try_parse_from(["tether", "plugins", "describe"]).is_err());
    }
}
