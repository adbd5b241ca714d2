use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use strata::{logging::init_logging, Runtime, RuntimeConfig};

#[derive(Debug, Parser)]
#[command(author, version, about = "Inspect strata resource databases and saved worlds")]
struct Cli {
    /// Runtime configuration YAML (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the resource root directory
    #[arg(long)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load the resource manifest and list its entries
    Manifest,
    /// Load a saved world and print it as JSON
    Inspect {
        /// Virtual path of the world resource
        path: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => RuntimeConfig::from_yaml(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    if let Some(root) = cli.root {
        config.resources.root_dir = root;
    }
    init_logging(&config.logging)?;

    let runtime = Runtime::builder(config).build();
    let resources = runtime.resources();
    let report = resources
        .load_database()
        .context("loading resource manifest")?;

    match cli.command {
        Command::Manifest => {
            for entry in resources.manifest_entries() {
                println!("{:>20}  {:<10}  {}", entry.id, entry.type_name, entry.path);
            }
            println!(
                "{} loaded, {} unresolved, {} failed",
                report.loaded.len(),
                report.unresolved.len(),
                report.failed.len()
            );
        }
        Command::Inspect { path } => {
            if !resources.exists(&path) {
                bail!("no resource at {path}");
            }
            let Some(world) = runtime.load_world(&path) else {
                bail!("{path} is not a world");
            };
            let json = world.borrow().on_serialize();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}
