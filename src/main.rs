use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use upcheck::config::{self, ConfigHost, UpdaterConfig};
use upcheck::update::cache::ManifestCache;
use upcheck::update::component::ComponentRegistration;
use upcheck::update::fetcher::ManifestFetcher;
use upcheck::update::resolver::UpdateResolver;
use upcheck::update::store::SqliteStore;

#[derive(Parser)]
#[command(name = "upcheck")]
#[command(version, about = "Self-hosted update checker for installed components")]
struct Cli {
    /// Path to the updater configuration file
    #[arg(short, long, default_value = "upcheck.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List components with an available update
    Check {
        /// Bypass the manifest cache and fetch now
        #[arg(long)]
        force: bool,
    },
    /// Show the detail record for one component
    Details {
        /// The component's slug
        slug: String,
        /// Bypass the manifest cache and fetch now
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command, config))
}

fn load_config(path: &Path) -> anyhow::Result<UpdaterConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("could not read configuration file {:?}", path))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse configuration file {:?}", path))
}

async fn run(command: Command, config: UpdaterConfig) -> anyhow::Result<()> {
    let db_path = config.cache.path.clone().unwrap_or_else(config::db_path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("could not create data directory {:?}", parent))?;
    }

    let store = Arc::new(SqliteStore::new(&db_path)?);
    let source = Arc::new(ManifestFetcher::new());
    let cache = ManifestCache::new(store, source, Duration::from_secs(config.cache.ttl_secs));
    let host = Arc::new(ConfigHost::new(&config));

    let mut resolver = UpdateResolver::new(cache, host);
    for component in &config.components {
        resolver.register(ComponentRegistration {
            entry: component.entry.clone(),
            manifest: component.manifest.clone(),
            id: component.id.clone(),
        });
    }

    match command {
        Command::Check { force } => {
            let updates = resolver.list_updates(force).await;
            println!("{}", serde_json::to_string_pretty(&updates)?);
        }
        Command::Details { slug, force } => match resolver.get_details(&slug, force).await {
            Some(details) => println!("{}", serde_json::to_string_pretty(&details)?),
            None => anyhow::bail!("could not retrieve details for \u{201c}{slug}\u{201d}"),
        },
    }

    Ok(())
}
