use anyhow::{Context, Result};
use clap::Parser;
use fiki::config::SourceKind;
use fiki::ingest::source;
use fiki::serve::WikiServer;
use fiki::watch::run_watcher;
use fiki::{Config, IngestionCoordinator, LiveIndex};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "fiki", version)]
#[command(about = "Serve a markdown wiki from a repository tarball or a local directory")]
struct Args {
    /// Path to a local directory to serve from instead of the remote repository
    #[arg(long)]
    local: Option<PathBuf>,

    /// Port to listen on (overrides http_server.port)
    #[arg(long)]
    port: Option<u16>,

    /// Re-ingest automatically when files under the local directory change
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();

    let mut config = Config::load()?;
    if let Some(root) = args.local {
        config.use_local(root);
    }
    if let Some(port) = args.port {
        config.http_server.port = port;
    }
    if args.watch {
        config.watch.enabled = true;
    }
    config.validate()?;

    log::info!("Starting fiki v{}", env!("CARGO_PKG_VERSION"));

    let source = source::from_config(&config.source)?;
    let live = Arc::new(LiveIndex::new());
    let coordinator = Arc::new(IngestionCoordinator::new(source, live));

    // Nothing to serve until the first pass succeeds, so its failure is fatal
    let initial = Arc::clone(&coordinator);
    let index = tokio::task::spawn_blocking(move || initial.run_pass())
        .await
        .context("initial ingestion task failed to complete")?
        .context("failed to build the wiki")?;
    log::info!("topics: {:?}", index.topics());

    if config.watch.enabled {
        match (config.source.kind, config.source.local_path.clone()) {
            (SourceKind::Local, Some(root)) => {
                let watched = Arc::clone(&coordinator);
                let debounce_ms = config.watch.debounce_ms;
                tokio::spawn(async move {
                    if let Err(e) = run_watcher(watched, root, debounce_ms).await {
                        log::error!("file watcher stopped: {}", e);
                    }
                });
            }
            _ => log::warn!("watch is only supported for local sources, ignoring"),
        }
    }

    WikiServer::new(coordinator, config).run().await?;
    Ok(())
}
