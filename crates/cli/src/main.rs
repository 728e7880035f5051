use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use stencil_registry::{Descriptor, MultiUrlStencilClient, StencilClient, StencilClientFactory, StencilConfig};
use stencil_types::DescriptorSummary;
use tracing::debug;

/// Resolve protobuf message descriptors from one or more descriptor set URLs.
///
/// Sources are tried in the order given: `get` returns the first source that
/// knows the type, while `list` and `packages` merge every source and let the
/// last one win on conflicts.
#[derive(Debug, Parser)]
#[command(name = "stencil", version)]
struct Cli {
    /// Descriptor set URL (http, https or file). Repeat for more sources.
    #[arg(long = "url", short = 'u', required = true)]
    urls: Vec<String>,

    /// Path to a config file; defaults to STENCIL_CONFIG_PATH or the user config dir.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print one message descriptor as JSON.
    Get {
        /// Fully-qualified type name, e.g. `shop.Order`.
        type_name: String,
    },
    /// Print every known type name.
    List,
    /// Print the type name to package mapping as JSON.
    Packages,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => StencilConfig::load_from_path(path),
        None => StencilConfig::load(),
    }
    .context("load stencil config")?;
    debug!(sources = cli.urls.len(), "resolving against descriptor sources");

    let client = StencilClientFactory::multi_url_client(cli.urls.iter().cloned(), &config).context("build descriptor client")?;
    let outcome = run(&client, &cli.command).await;
    client.close().await?;
    println!("{}", outcome?);
    Ok(())
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(client: &MultiUrlStencilClient, command: &Command) -> Result<String> {
    match command {
        Command::Get { type_name } => {
            let descriptor = client
                .get(type_name)
                .await
                .ok_or_else(|| anyhow!("type '{}' not found in any source", type_name))?;
            render_descriptor(&descriptor)
        }
        Command::List => Ok(render_type_names(&client.get_all().await)),
        Command::Packages => render_packages(client.type_name_to_package_name_map().await),
    }
}

fn render_descriptor(descriptor: &Descriptor) -> Result<String> {
    Ok(serde_json::to_string_pretty(&DescriptorSummary::from(descriptor))?)
}

fn render_type_names(descriptors: &HashMap<String, Descriptor>) -> String {
    let mut names: Vec<&str> = descriptors.keys().map(String::as_str).collect();
    names.sort_unstable();
    names.join("\n")
}

fn render_packages(packages: HashMap<String, String>) -> Result<String> {
    let sorted: BTreeMap<String, String> = packages.into_iter().collect();
    Ok(serde_json::to_string_pretty(&sorted)?)
}
