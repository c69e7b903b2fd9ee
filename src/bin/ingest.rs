//! Run one ingestion pass without serving and report what was built.

use anyhow::{Context, Result};
use clap::Parser;
use fiki::ingest::{source, TreeNode};
use fiki::{Config, IngestionCoordinator, LiveIndex};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Build the wiki index once and print a summary")]
struct Args {
    /// Read from a local directory instead of the configured source
    #[arg(long)]
    local: Option<PathBuf>,

    /// Print the whole index set as JSON
    #[arg(long)]
    json: bool,

    /// Print the page tree
    #[arg(long)]
    tree: bool,
}

fn print_tree(node: &TreeNode, depth: usize) {
    for child in node.children.values() {
        let marker = if child.is_page { "" } else { "/" };
        println!("{}{}{}", "  ".repeat(depth), child.name, marker);
        print_tree(child, depth + 1);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();

    let mut config = Config::load()?;
    if let Some(root) = args.local {
        config.use_local(root);
    }
    config.validate()?;

    let source = source::from_config(&config.source)?;
    let coordinator = IngestionCoordinator::new(source, Arc::new(LiveIndex::new()));
    let index = coordinator.run_pass().context("ingestion pass failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(index.as_ref())?);
        return Ok(());
    }

    if let Some(report) = coordinator.last_report() {
        println!("\n=== Ingestion Summary ===");
        println!("Source:      {}", report.source);
        println!("Entries:     {}", report.stats.entries);
        println!("Ignored:     {}", report.stats.ignored);
        println!("Pages:       {}", report.stats.pages);
        println!("Directories: {}", report.stats.directories);
        println!("Topics:      {}", report.stats.topics);
        println!("Time:        {} ms", report.elapsed_ms);
    }

    if !index.topics().is_empty() {
        let topics: Vec<&str> = index.topics().iter().map(String::as_str).collect();
        println!("\nTopics: {}", topics.join(", "));
    }

    if args.tree {
        println!("\n=== Page Tree ===");
        print_tree(index.tree(), 0);
    }

    Ok(())
}
