use anyhow::{Context, Result};
use clap::Parser;
use gtfs_loader::{FeedLoader, FeedPatcher, Schema};
use log::info;
use std::path::PathBuf;
use std::time::Instant;

/// Loads a GTFS feed directory and writes it back in canonical form
#[derive(Parser, Debug)]
#[command(name = "gtfs-patch", version)]
struct Cli {
    /// Feed directory to read
    input: PathBuf,
    /// Directory to write the patched feed to (default: INPUT, patched in place)
    output: Option<PathBuf>,
    /// Sort every collection by primary key, then group key, once loaded
    #[arg(long)]
    sorted_read: bool,
    /// Write entities in canonical order
    #[arg(long)]
    sorted_output: bool,
    /// Log the number of entities of each file
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let output = cli.output.as_ref().unwrap_or(&cli.input);

    let schema = Schema::gtfs_subset().context("invalid schema")?;

    let time = Instant::now();
    let feed = FeedLoader::default()
        .sorted_read(cli.sorted_read)
        .load(&cli.input, &schema)
        .with_context(|| format!("impossible to read feed {}", cli.input.display()))?;
    info!("Loaded {} in {:.2}s", cli.input.display(), time.elapsed().as_secs_f32());

    if cli.stats {
        feed.log_stats();
    }

    let time = Instant::now();
    FeedPatcher::default()
        .sorted_output(cli.sorted_output)
        .patch(&feed, &schema, &cli.input, output)
        .with_context(|| format!("impossible to write feed {}", output.display()))?;
    info!("Patched {} in {:.2}s", output.display(), time.elapsed().as_secs_f32());
    Ok(())
}
