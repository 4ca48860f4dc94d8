use aetrader::config::ConfigManager;
use aetrader::data::{CachedSource, CsvSource, DataRequest, SeriesOptions};
use aetrader::engines::evaluation::{default_gene_spec, RuleStrategy};
use aetrader::engines::generation::{EvolutionEngine, LoggingProgressCallback};
use aetrader::persistence::JsonLinesStore;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "aetrader", about = "Evolve trading rules against historical candles")]
struct Cli {
    /// TOML or JSON configuration file; AETRADER__SECTION__FIELD variables override it
    #[arg(long, env = "AETRADER_CONFIG")]
    config: Option<PathBuf>,

    /// CSV file with timestamp, open, high, low, close and volume columns
    #[arg(long)]
    data: PathBuf,

    /// Overrides `data.symbol`
    #[arg(long)]
    symbol: Option<String>,

    /// Overrides `evolution.seed`
    #[arg(long)]
    seed: Option<u64>,

    /// Append the best genome of every generation to this JSON-lines file
    #[arg(long)]
    store: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut manager = ConfigManager::new();
    if let Some(path) = &cli.config {
        manager = manager.with_file(path);
    }
    let mut config = manager.load().context("loading configuration")?;
    if let Some(symbol) = cli.symbol {
        config.data.symbol = symbol;
    }
    if cli.seed.is_some() {
        config.evolution.seed = cli.seed;
    }

    let source = CachedSource::new(
        CsvSource::file(&cli.data, SeriesOptions::from(&config.data)).with_min_rows(config.data.min_rows),
        Duration::from_secs(config.data.cache_ttl_secs),
        16,
    );
    let interval = config.data.interval_secs.map(|s| format!("{}s", s)).unwrap_or_default();
    let request = DataRequest::new(config.data.symbol.clone(), interval);

    let mut engine = EvolutionEngine::new(&config, default_gene_spec()?)?;
    if let Some(path) = &cli.store {
        engine = engine.with_store(Box::new(JsonLinesStore::new(path)));
    }

    let result = engine
        .run_with_source(&source, &request, LoggingProgressCallback)
        .with_context(|| format!("evolving against {}", cli.data.display()))?;

    let rule = RuleStrategy::from_genome(&result.best.genome)?;
    let champion = serde_json::json!({
        "termination": result.termination,
        "generations": result.history.len(),
        "genome": result.best.genome,
        "rule": rule,
        "fitness": result.best.fitness,
        "metrics": result.best.metrics,
    });
    println!("{}", serde_json::to_string_pretty(&champion)?);

    Ok(())
}
