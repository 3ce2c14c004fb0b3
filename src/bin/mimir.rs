//! mimir: print random quotes
//!
//! Reads `~/.mimir/config.toml` (or `--config`); without a config file every
//! bundled source is used with equal weight.

use std::path::PathBuf;

use clap::Parser;
use mimir::{Config, MimirBuilder, MimirError, SelectionMode, TextQuote};

/// Random quotes from pluggable sources
#[derive(Parser)]
#[command(name = "mimir")]
#[command(version)]
#[command(about = "Random quotes from pluggable sources")]
struct Args {
    /// Config file path
    #[arg(short, long, env = "MIMIR_CONFIG")]
    config: Option<PathBuf>,

    /// Only quotes carrying this tag (repeat for any of several tags)
    #[arg(short, long)]
    tag: Vec<String>,

    /// Number of quotes to print
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,

    /// cached, download or mixed (default from config, else mixed)
    #[arg(short, long)]
    mode: Option<SelectionMode>,

    /// Seed every source's cache before serving
    #[arg(long)]
    prefetch: bool,

    /// Print quotes as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        // Only fall back to defaults when no config file exists at all
        Err(MimirError::Configuration(msg))
            if args.config.is_none() && msg.starts_with("No config file found") =>
        {
            tracing::debug!(%msg, "no config file, using bundled sources");
            default_config()
        }
        Err(e) => return Err(e.into()),
    };

    let generator = MimirBuilder::from_config(&config).build()?;

    if args.prefetch || config.cache.prefetch {
        let tag = (args.tag.len() == 1).then(|| args.tag[0].as_str());
        for (source, result) in generator.prefetch_all(tag).await {
            match result {
                Ok(added) => tracing::info!(source = %source, added, "prefetched"),
                Err(e) => eprintln!("prefetch from {source} failed: {e}"),
            }
        }
    }

    let mode = args.mode.unwrap_or(config.mode);
    let tags: Vec<&str> = args.tag.iter().map(String::as_str).collect();

    for _ in 0..args.count {
        let quote = match tags.as_slice() {
            [] => generator.get_random_quote(mode).await?,
            [tag] => generator.get_random_quote_tagged(tag, mode).await?,
            tags => generator.get_random_quote_tags(tags, mode).await?,
        };
        print_quote(&quote, args.json)?;
    }

    Ok(())
}

fn default_config() -> Config {
    let mut config = Config::default();
    #[cfg(feature = "kanye")]
    config
        .sources
        .push(mimir::SourceConfig::new(mimir::SourceKind::Kanye, 1));
    #[cfg(feature = "tronald")]
    config
        .sources
        .push(mimir::SourceConfig::new(mimir::SourceKind::Tronald, 1));
    config
}

fn print_quote(quote: &TextQuote, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(quote)?);
    } else {
        println!("{quote}");
    }
    Ok(())
}
