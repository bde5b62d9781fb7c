use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kvbench::config::parse_duration;
use kvbench::{
    BenchConfig, BenchError, Durability, EngineSelection, OutputFormat, Reporter, ScenarioRunner,
};

#[derive(Parser)]
#[command(name = "kvbench")]
#[command(about = "Benchmark embedded key-value storage engines")]
struct Args {
    /// Test duration for each scenario (e.g. 500ms, 10s, 1m)
    #[arg(short = 'd', long, default_value = "1m", value_parser = parse_duration)]
    duration: Duration,

    /// Concurrent workers (defaults to the number of CPUs)
    #[arg(short = 'c', long)]
    concurrency: Option<usize>,

    /// Value size in bytes
    #[arg(long, default_value_t = 256)]
    size: usize,

    /// Force every write to stable storage
    #[arg(long)]
    fsync: bool,

    /// Store type: map, sqlite, sled, redb; append /memory for in-memory mode
    #[arg(short = 's', long, default_value = "map", value_parser = parse_store)]
    store: EngineSelection,

    /// Records per batch in the batch-write scenario
    #[arg(long, default_value_t = 1000)]
    batch_size: usize,

    /// Wrap the set scenario's keys inside this many indices
    #[arg(long)]
    key_space: Option<u64>,

    /// Data directory (a temporary one is used and removed otherwise)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Output format: console or json
    #[arg(long, default_value = "console")]
    format: OutputFormat,
}

fn parse_store(s: &str) -> Result<EngineSelection, String> {
    s.parse().map_err(|e: BenchError| e.to_string())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let defaults = BenchConfig::default();
    let config = BenchConfig {
        duration: args.duration,
        concurrency: args.concurrency.unwrap_or(defaults.concurrency),
        value_size: args.size,
        durability: Durability::from_fsync(args.fsync),
        batch_size: args.batch_size,
        key_space: args.key_space,
    };
    config.validate()?;

    // Held until the end of main so the directory outlives the engine.
    let (_scratch, dir) = match args.dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating data directory {}", dir.display()))?;
            (None, dir)
        }
        None => {
            let tmp = tempfile::Builder::new()
                .prefix("kvbench-")
                .tempdir()
                .context("creating temporary data directory")?;
            let dir = tmp.path().to_path_buf();
            (Some(tmp), dir)
        }
    };

    let selection = args.store;
    let label = selection.label(config.durability);

    let store = selection
        .open(&dir, config.durability)
        .with_context(|| format!("opening {}", label))?;

    let mut reporter = Reporter::new(std::io::stdout().lock(), args.format);
    reporter.header(&config)?;

    let runner = ScenarioRunner::new(store.as_ref(), &config, label.clone());
    let mut write_error = None;
    let outcome = runner.run_all(|result| {
        if let Err(e) = reporter.report(result) {
            write_error.get_or_insert(e);
        }
    });

    // Workers have all been joined by now, closing is safe even on failure.
    tracing::info!(%label, "closing engine");
    let closed = store.close();

    outcome.with_context(|| format!("benchmarking {}", label))?;
    if let Some(e) = write_error {
        return Err(e).context("writing results");
    }
    closed.with_context(|| format!("closing {}", label))?;

    tracing::info!(%label, "done");
    Ok(())
}
